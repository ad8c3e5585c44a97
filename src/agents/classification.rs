//! Document classification agent.
//!
//! First stage of the analysis pipeline: decides what a document is and
//! which compliance frameworks apply to it.

use crate::agents::factory::AgentConfig;
use crate::agents::{parse_input, Agent};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::types::{
    AgentContext, AgentHealth, AgentMetadata, AgentOutput, CapabilityDescriptor, CapabilityKind,
    ExecutionFailure, Result,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

const SYSTEM_PROMPT: &str = r#"You are a compliance document classifier.
Identify the document type and which compliance frameworks apply
(ferpa, hipaa, gdpr, itar, cmmc, soc2).
Respond with JSON: {"document_type": string, "applicable_frameworks": [string], "confidence": number}"#;

/// Classifies documents and maps them to applicable compliance frameworks.
pub struct ClassificationAgent {
    metadata: AgentMetadata,
    client: Arc<dyn CompletionClient>,
    temperature: f32,
    max_tokens: u32,
    initialized: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct ClassifyInput {
    document_id: String,
    content: String,
}

impl ClassificationAgent {
    pub fn new(config: &AgentConfig, client: Arc<dyn CompletionClient>) -> Self {
        let metadata = AgentMetadata {
            id: config.id_for("classification"),
            name: config
                .name
                .clone()
                .unwrap_or_else(|| "Document Classification Agent".to_string()),
            description: config.description.clone().unwrap_or_else(|| {
                "Classifies documents and determines applicable compliance frameworks".to_string()
            }),
            version: config.version.clone().unwrap_or_else(|| "1.0.0".to_string()),
            capabilities: vec![
                CapabilityDescriptor::new(
                    CapabilityKind::DocumentClassification,
                    "Determine the document type",
                )
                .with_contracts("{document_id, content}", "{document_type, confidence}"),
                CapabilityDescriptor::new(
                    CapabilityKind::FrameworkMapping,
                    "Map a document to applicable compliance frameworks",
                )
                .with_contracts("{document_id, content}", "{applicable_frameworks}"),
            ],
            dependencies: vec!["completion-api".to_string()],
            tags: config.tags_with("classification"),
        };

        Self {
            metadata,
            client,
            temperature: config.temperature.unwrap_or(0.2),
            max_tokens: config.max_tokens.unwrap_or(2048),
            initialized: AtomicBool::new(false),
        }
    }

    fn prompt(input: &ClassifyInput) -> String {
        format!(
            "Classify the following document.\n\nDocument id: {}\n\n{}",
            input.document_id, input.content
        )
    }
}

#[async_trait]
impl Agent for ClassificationAgent {
    fn metadata(&self) -> &AgentMetadata {
        &self.metadata
    }

    async fn initialize(&self) -> Result<()> {
        if self.initialized.swap(true, Ordering::Relaxed) {
            return Ok(());
        }
        debug!(
            agent_id = %self.metadata.id,
            model = self.client.model_name(),
            "classification agent initialized"
        );
        Ok(())
    }

    async fn execute(&self, input: &Value, context: &AgentContext) -> Result<AgentOutput> {
        let input: ClassifyInput = parse_input(input)?;
        if input.content.trim().is_empty() {
            return Err(ExecutionFailure::invalid_input("document content is empty").into());
        }

        debug!(
            agent_id = %self.metadata.id,
            document_id = %input.document_id,
            project_id = %context.project_id,
            "classifying document"
        );

        let request = CompletionRequest::new(SYSTEM_PROMPT, Self::prompt(&input))
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        let completion = self.client.complete(&request).await?;

        let mut output =
            AgentOutput::from_text(&completion.content).with_tokens(completion.tokens_used);
        if let Some(map) = output.data.as_object_mut() {
            map.entry("document_id")
                .or_insert_with(|| Value::String(input.document_id.clone()));
        }
        Ok(output)
    }

    async fn health_check(&self) -> Result<AgentHealth> {
        if !self.initialized.load(Ordering::Relaxed) {
            return Ok(AgentHealth::degraded("not initialized"));
        }
        if self.client.model_name().is_empty() {
            return Ok(AgentHealth::unhealthy("no model configured"));
        }
        Ok(AgentHealth::healthy())
    }
}
