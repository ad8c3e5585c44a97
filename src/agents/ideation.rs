//! Gap & recommendation ideation agent.

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

const SYSTEM_PROMPT: &str = r#"You are a compliance analyst.
Given a document and target frameworks, identify coverage gaps and propose
concrete controls to close them.
Respond with JSON: {"gaps": [{"framework": string, "requirement": string, "gap": string}], "recommendations": [string]}"#;

/// Proposes controls and surfaces coverage gaps for target frameworks.
pub struct IdeationAgent {
    metadata: AgentMetadata,
    client: Arc<dyn CompletionClient>,
    temperature: f32,
    max_tokens: u32,
    initialized: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct IdeationInput {
    document_id: String,
    content: String,
    #[serde(default)]
    frameworks: Vec<String>,
}

impl IdeationAgent {
    pub fn new(config: &AgentConfig, client: Arc<dyn CompletionClient>) -> Self {
        let metadata = AgentMetadata {
            id: config.id_for("ideation"),
            name: config
                .name
                .clone()
                .unwrap_or_else(|| "Control Ideation Agent".to_string()),
            description: config.description.clone().unwrap_or_else(|| {
                "Surfaces compliance gaps and proposes controls to close them".to_string()
            }),
            version: config.version.clone().unwrap_or_else(|| "1.0.0".to_string()),
            capabilities: vec![
                CapabilityDescriptor::new(
                    CapabilityKind::GapAnalysis,
                    "Identify framework requirements a document does not cover",
                )
                .with_contracts("{document_id, content, frameworks?}", "{gaps}"),
                CapabilityDescriptor::new(
                    CapabilityKind::ControlIdeation,
                    "Propose controls for uncovered requirements",
                )
                .with_contracts("{document_id, content, frameworks?}", "{recommendations}"),
            ],
            dependencies: vec!["completion-api".to_string()],
            tags: config.tags_with("ideation"),
        };

        Self {
            metadata,
            client,
            temperature: config.temperature.unwrap_or(0.4),
            max_tokens: config.max_tokens.unwrap_or(2048),
            initialized: AtomicBool::new(false),
        }
    }

    /// Unknown framework names are dropped rather than failing the run; an
    /// empty list means "consider all of them".
    fn target_frameworks(input: &IdeationInput) -> Vec<Framework> {
        let parsed: Vec<Framework> = input
            .frameworks
            .iter()
            .filter_map(|name| Framework::parse(name))
            .collect();
        if parsed.is_empty() {
            Framework::ALL.to_vec()
        } else {
            parsed
        }
    }

    fn prompt(input: &IdeationInput, frameworks: &[Framework]) -> String {
        let names: Vec<&str> = frameworks.iter().map(|f| f.as_str()).collect();
        format!(
            "Target frameworks: {}\nDocument id: {}\n\n{}",
            names.join(", "),
            input.document_id,
            input.content
        )
    }
}

#[async_trait]
impl Agent for IdeationAgent {
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
            "ideation agent initialized"
        );
        Ok(())
    }

    async fn execute(&self, input: &Value, context: &AgentContext) -> Result<AgentOutput> {
        let input: IdeationInput = parse_input(input)?;
        if input.content.trim().is_empty() {
            return Err(ExecutionFailure::invalid_input("document content is empty").into());
        }
        let frameworks = Self::target_frameworks(&input);

        debug!(
            agent_id = %self.metadata.id,
            document_id = %input.document_id,
            project_id = %context.project_id,
            framework_count = frameworks.len(),
            "running gap ideation"
        );

        let request = CompletionRequest::new(SYSTEM_PROMPT, Self::prompt(&input, &frameworks))
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
