//! Document improvement agent.

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

const SYSTEM_PROMPT: &str = r#"You are a compliance remediation writer.
Rewrite or extend the document sections named in the findings so they satisfy
the cited requirements. Preserve the document's tone and structure.
Respond with JSON: {"revisions": [{"section": string, "replacement": string, "rationale": string}]}"#;

/// Drafts remediation text for findings raised by the grading stage.
pub struct ImprovementAgent {
    metadata: AgentMetadata,
    client: Arc<dyn CompletionClient>,
    temperature: f32,
    max_tokens: u32,
    initialized: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct ImprovementInput {
    document_id: String,
    content: String,
    #[serde(default)]
    findings: Vec<Value>,
}

impl ImprovementAgent {
    pub fn new(config: &AgentConfig, client: Arc<dyn CompletionClient>) -> Self {
        let metadata = AgentMetadata {
            id: config.id_for("improvement"),
            name: config
                .name
                .clone()
                .unwrap_or_else(|| "Document Improvement Agent".to_string()),
            description: config.description.clone().unwrap_or_else(|| {
                "Drafts remediation text for compliance findings".to_string()
            }),
            version: config.version.clone().unwrap_or_else(|| "1.0.0".to_string()),
            capabilities: vec![
                CapabilityDescriptor::new(
                    CapabilityKind::RemediationPlanning,
                    "Plan remediation steps for compliance findings",
                )
                .with_contracts("{document_id, content, findings?}", "{revisions}"),
                CapabilityDescriptor::new(
                    CapabilityKind::DocumentRewrite,
                    "Draft replacement text for non-compliant sections",
                )
                .with_contracts("{document_id, content, findings?}", "{revisions}"),
            ],
            dependencies: vec!["completion-api".to_string()],
            tags: config.tags_with("improvement"),
        };

        Self {
            metadata,
            client,
            temperature: config.temperature.unwrap_or(0.5),
            max_tokens: config.max_tokens.unwrap_or(4096),
            initialized: AtomicBool::new(false),
        }
    }

    fn prompt(input: &ImprovementInput) -> String {
        let findings = if input.findings.is_empty() {
            "none provided, improve overall compliance posture".to_string()
        } else {
            serde_json::to_string_pretty(&input.findings).unwrap_or_default()
        };
        format!(
            "Findings:\n{}\n\nDocument id: {}\n\n{}",
            findings, input.document_id, input.content
        )
    }
}

#[async_trait]
impl Agent for ImprovementAgent {
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
            "improvement agent initialized"
        );
        Ok(())
    }

    async fn execute(&self, input: &Value, context: &AgentContext) -> Result<AgentOutput> {
        let input: ImprovementInput = parse_input(input)?;
        if input.content.trim().is_empty() {
            return Err(ExecutionFailure::invalid_input("document content is empty").into());
        }

        debug!(
            agent_id = %self.metadata.id,
            document_id = %input.document_id,
            project_id = %context.project_id,
            finding_count = input.findings.len(),
            "drafting remediation"
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
