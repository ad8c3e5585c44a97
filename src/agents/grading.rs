//! Compliance grading agent.
//!
//! Scores a document against one named framework and reports findings.

use crate::agents::factory::AgentConfig;
use crate::agents::{parse_input, Agent};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::types::{
    AgentContext, AgentHealth, AgentMetadata, AgentOutput, CapabilityDescriptor, CapabilityKind,
    ExecutionFailure, Framework, Result,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

const SYSTEM_PROMPT: &str = r#"You are a compliance auditor.
Score the document against the named framework on a 0-100 scale and list
concrete findings with section references.
Respond with JSON: {"score": number, "findings": [{"section": string, "issue": string, "severity": string}]}"#;

/// Grades documents against a single compliance framework.
pub struct GradingAgent {
    metadata: AgentMetadata,
    client: Arc<dyn CompletionClient>,
    temperature: f32,
    max_tokens: u32,
    initialized: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct GradeInput {
    document_id: String,
    content: String,
    framework: String,
}

impl GradingAgent {
    pub fn new(config: &AgentConfig, client: Arc<dyn CompletionClient>) -> Self {
        let metadata = AgentMetadata {
            id: config.id_for("grading"),
            name: config
                .name
                .clone()
                .unwrap_or_else(|| "Compliance Grading Agent".to_string()),
            description: config.description.clone().unwrap_or_else(|| {
                "Scores documents against compliance frameworks and reports findings".to_string()
            }),
            version: config.version.clone().unwrap_or_else(|| "1.0.0".to_string()),
            capabilities: vec![
                CapabilityDescriptor::new(
                    CapabilityKind::ComplianceScoring,
                    "Score a document against a framework",
                )
                .with_contracts("{document_id, content, framework}", "{score, findings}"),
                CapabilityDescriptor::new(
                    CapabilityKind::GapAnalysis,
                    "Report sections that fall short of framework requirements",
                )
                .with_contracts("{document_id, content, framework}", "{findings}"),
            ],
            dependencies: vec!["completion-api".to_string()],
            tags: config.tags_with("grading"),
        };

        Self {
            metadata,
            client,
            temperature: config.temperature.unwrap_or(0.1),
            max_tokens: config.max_tokens.unwrap_or(2048),
            initialized: AtomicBool::new(false),
        }
    }

    fn prompt(input: &GradeInput, framework: Framework) -> String {
        format!(
            "Framework: {}\nDocument id: {}\n\n{}",
            framework, input.document_id, input.content
        )
    }
}

#[async_trait]
impl Agent for GradingAgent {
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
            "grading agent initialized"
        );
        Ok(())
    }

    async fn execute(&self, input: &Value, context: &AgentContext) -> Result<AgentOutput> {
        let input: GradeInput = parse_input(input)?;
        let framework = Framework::parse(&input.framework).ok_or_else(|| {
            ExecutionFailure::invalid_input(format!("unknown framework: {}", input.framework))
        })?;
        if input.content.trim().is_empty() {
            return Err(ExecutionFailure::invalid_input("document content is empty").into());
        }

        debug!(
            agent_id = %self.metadata.id,
            document_id = %input.document_id,
            framework = %framework,
            project_id = %context.project_id,
            "grading document"
        );

        let request = CompletionRequest::new(SYSTEM_PROMPT, Self::prompt(&input, framework))
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        let completion = self.client.complete(&request).await?;

        let mut output =
            AgentOutput::from_text(&completion.content).with_tokens(completion.tokens_used);
        if let Some(map) = output.data.as_object_mut() {
            map.entry("document_id")
                .or_insert_with(|| Value::String(input.document_id.clone()));
            map.entry("framework")
                .or_insert_with(|| Value::String(framework.as_str().to_string()));
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
