//! Agent factory: blueprints for the analysis agents and per-project team
//! assembly.
//!
//! Templates map an [`AgentKind`] to a constructor plus the capability and
//! tag sets its instances may advertise. The factory is permissive:
//! `create_agent` warns about capability mismatches instead of failing, and
//! strict checking is available separately through [`AgentFactory::validate_config`]
//! for API-driven creation paths.

use crate::agents::{
    Agent, ClassificationAgent, GradingAgent, IdeationAgent, ImprovementAgent,
};
use crate::llm::CompletionClient;
use crate::registry::AgentRegistry;
use crate::types::{AgentKind, CapabilityKind, ProctorError, Result};
use crate::utils::config::AgentDefaults;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The fixed team every project gets, one agent per analysis stage.
const TEAM_KINDS: [AgentKind; 4] = [
    AgentKind::Classification,
    AgentKind::Ideation,
    AgentKind::Grading,
    AgentKind::Improvement,
];

// ============= Creation Config =============

/// Construction parameters for a single agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub kind: AgentKind,
    /// Explicit id; generated from the kind when absent.
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    /// Capabilities the caller expects the agent to have, advisory.
    #[serde(default)]
    pub capabilities: Vec<CapabilityKind>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl AgentConfig {
    pub fn new(kind: AgentKind) -> Self {
        Self {
            kind,
            id: None,
            name: None,
            description: None,
            version: None,
            capabilities: Vec::new(),
            tags: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<CapabilityKind>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// The explicit id, or a generated `{prefix}-{short uuid}` one.
    pub fn id_for(&self, prefix: &str) -> String {
        self.id.clone().unwrap_or_else(|| {
            let suffix = Uuid::new_v4().simple().to_string();
            format!("{}-{}", prefix, &suffix[..8])
        })
    }

    /// Config tags plus the kind tag, without duplicates.
    pub fn tags_with(&self, kind_tag: &str) -> Vec<String> {
        let mut tags = self.tags.clone();
        if !tags.iter().any(|t| t == kind_tag) {
            tags.push(kind_tag.to_string());
        }
        tags
    }
}

// ============= Templates =============

type AgentConstructor =
    Arc<dyn Fn(&AgentConfig, Arc<dyn CompletionClient>) -> Result<Arc<dyn Agent>> + Send + Sync>;

/// Blueprint for one agent kind.
#[derive(Clone)]
pub struct AgentTemplate {
    pub kind: AgentKind,
    pub description: String,
    /// Capability space instances of this template cover.
    pub required_capabilities: Vec<CapabilityKind>,
    /// Tags instances may carry; empty means unrestricted.
    pub supported_tags: Vec<String>,
    constructor: AgentConstructor,
}

impl AgentTemplate {
    pub fn new<F>(kind: AgentKind, description: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&AgentConfig, Arc<dyn CompletionClient>) -> Result<Arc<dyn Agent>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            kind,
            description: description.into(),
            required_capabilities: Vec::new(),
            supported_tags: Vec::new(),
            constructor: Arc::new(constructor),
        }
    }

    pub fn with_required_capabilities(mut self, capabilities: Vec<CapabilityKind>) -> Self {
        self.required_capabilities = capabilities;
        self
    }

    pub fn with_supported_tags(mut self, tags: Vec<String>) -> Self {
        self.supported_tags = tags;
        self
    }
}

/// Outcome of validating an [`AgentConfig`] against its template.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

// ============= Team Reports =============

/// Per-member outcome of a team operation.
#[derive(Debug, Clone, Serialize)]
pub struct TeamMemberOutcome {
    pub kind: AgentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of creating or destroying a project team, one entry per member.
#[derive(Debug, Clone, Serialize)]
pub struct TeamReport {
    pub project_id: String,
    pub members: Vec<TeamMemberOutcome>,
}

impl TeamReport {
    fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            members: Vec::new(),
        }
    }

    /// Ids of the members the operation succeeded for.
    pub fn succeeded_ids(&self) -> Vec<&str> {
        self.members
            .iter()
            .filter(|m| m.error.is_none())
            .filter_map(|m| m.agent_id.as_deref())
            .collect()
    }

    pub fn failures(&self) -> Vec<&TeamMemberOutcome> {
        self.members.iter().filter(|m| m.error.is_some()).collect()
    }

    pub fn is_complete(&self) -> bool {
        !self.members.is_empty() && self.members.iter().all(|m| m.error.is_none())
    }
}

// ============= Factory =============

/// Creates agents from registered blueprints and assembles per-project teams.
pub struct AgentFactory {
    templates: RwLock<HashMap<AgentKind, AgentTemplate>>,
    registry: Arc<AgentRegistry>,
    client: Arc<dyn CompletionClient>,
    defaults: AgentDefaults,
}

impl AgentFactory {
    /// Factory with no templates. Most callers want
    /// [`AgentFactory::with_builtin_templates`].
    pub fn new(
        registry: Arc<AgentRegistry>,
        client: Arc<dyn CompletionClient>,
        defaults: AgentDefaults,
    ) -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
            registry,
            client,
            defaults,
        }
    }

    /// Factory pre-loaded with the four built-in analysis blueprints.
    pub fn with_builtin_templates(
        registry: Arc<AgentRegistry>,
        client: Arc<dyn CompletionClient>,
        defaults: AgentDefaults,
    ) -> Self {
        let factory = Self::new(registry, client, defaults);
        for template in Self::builtin_templates() {
            factory.register_template(template);
        }
        factory
    }

    fn builtin_templates() -> Vec<AgentTemplate> {
        vec![
            AgentTemplate::new(
                AgentKind::Classification,
                "Document classification and framework mapping",
                |config, client| Ok(Arc::new(ClassificationAgent::new(config, client))),
            )
            .with_required_capabilities(vec![
                CapabilityKind::DocumentClassification,
                CapabilityKind::FrameworkMapping,
            ]),
            AgentTemplate::new(
                AgentKind::Ideation,
                "Gap analysis and control ideation",
                |config, client| Ok(Arc::new(IdeationAgent::new(config, client))),
            )
            .with_required_capabilities(vec![
                CapabilityKind::GapAnalysis,
                CapabilityKind::ControlIdeation,
            ]),
            AgentTemplate::new(
                AgentKind::Grading,
                "Compliance scoring against a framework",
                |config, client| Ok(Arc::new(GradingAgent::new(config, client))),
            )
            .with_required_capabilities(vec![
                CapabilityKind::ComplianceScoring,
                CapabilityKind::GapAnalysis,
            ]),
            AgentTemplate::new(
                AgentKind::Improvement,
                "Remediation planning and document rewrite",
                |config, client| Ok(Arc::new(ImprovementAgent::new(config, client))),
            )
            .with_required_capabilities(vec![
                CapabilityKind::RemediationPlanning,
                CapabilityKind::DocumentRewrite,
            ]),
        ]
    }

    /// Idempotent upsert into the kind→template map. No constraints are
    /// checked at registration time.
    pub fn register_template(&self, template: AgentTemplate) {
        debug!(kind = %template.kind, "registering agent template");
        self.templates.write().insert(template.kind.clone(), template);
    }

    pub fn has_template(&self, kind: &AgentKind) -> bool {
        self.templates.read().contains_key(kind)
    }

    pub fn template_kinds(&self) -> Vec<AgentKind> {
        self.templates.read().keys().cloned().collect()
    }

    /// Construct an agent from its template.
    ///
    /// Capability validation here is advisory: requested capabilities the
    /// template does not cover are logged, not rejected. Constructor failures
    /// propagate unchanged.
    pub fn create_agent(&self, config: &AgentConfig) -> Result<Arc<dyn Agent>> {
        let template = self
            .templates
            .read()
            .get(&config.kind)
            .cloned()
            .ok_or_else(|| ProctorError::UnknownAgentKind(config.kind.to_string()))?;

        let uncovered: Vec<&CapabilityKind> = config
            .capabilities
            .iter()
            .filter(|cap| !template.required_capabilities.contains(cap))
            .collect();
        if !uncovered.is_empty() {
            warn!(
                kind = %config.kind,
                uncovered = ?uncovered,
                "requested capabilities not covered by template"
            );
        }

        let config = self.effective(config);
        (template.constructor)(&config, Arc::clone(&self.client))
    }

    /// Construct and register in one step, returning the new agent's id.
    pub async fn create_and_register(&self, config: &AgentConfig) -> Result<String> {
        let agent = self.create_agent(config)?;
        let id = agent.metadata().id.clone();
        self.registry.register(agent).await?;
        Ok(id)
    }

    /// Create the fixed per-project team, one agent per built-in kind, each
    /// tagged with the project. Members are attempted independently; one
    /// failure does not abort the rest.
    pub async fn create_project_team(&self, project_id: &str) -> TeamReport {
        let mut report = TeamReport::new(project_id);
        for kind in TEAM_KINDS {
            let config = AgentConfig::new(kind.clone())
                .with_id(format!("{}-{}", kind, project_id))
                .with_tag(format!("project:{project_id}"));
            match self.create_and_register(&config).await {
                Ok(agent_id) => {
                    report.members.push(TeamMemberOutcome {
                        kind,
                        agent_id: Some(agent_id),
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(
                        project_id,
                        kind = %kind,
                        error = %e,
                        "failed to create team member"
                    );
                    report.members.push(TeamMemberOutcome {
                        kind,
                        agent_id: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        info!(
            project_id,
            created = report.succeeded_ids().len(),
            failed = report.failures().len(),
            "project team created"
        );
        report
    }

    /// Unregister every instance whose tags or description reference the
    /// project. Best-effort, continues past individual failures.
    pub fn destroy_project_team(&self, project_id: &str) -> TeamReport {
        let project_tag = format!("project:{project_id}");
        let mut report = TeamReport::new(project_id);

        for snapshot in self.registry.list() {
            let metadata = &snapshot.metadata;
            if !metadata.tags.contains(&project_tag)
                && !metadata.description.contains(project_id)
            {
                continue;
            }
            let outcome = match self.registry.unregister(&metadata.id) {
                Ok(()) => TeamMemberOutcome {
                    kind: kind_from_tags(&metadata.tags),
                    agent_id: Some(metadata.id.clone()),
                    error: None,
                },
                Err(e) => {
                    warn!(project_id, agent_id = %metadata.id, error = %e, "failed to unregister team member");
                    TeamMemberOutcome {
                        kind: kind_from_tags(&metadata.tags),
                        agent_id: Some(metadata.id.clone()),
                        error: Some(e.to_string()),
                    }
                }
            };
            report.members.push(outcome);
        }
        info!(
            project_id,
            removed = report.succeeded_ids().len(),
            failed = report.failures().len(),
            "project team destroyed"
        );
        report
    }

    /// Strict, pure validation of a config against its template: kind
    /// existence, capability subset, tag subset. Not called by
    /// [`AgentFactory::create_agent`], which stays permissive.
    pub fn validate_config(&self, config: &AgentConfig) -> ConfigValidation {
        let mut errors = Vec::new();
        let templates = self.templates.read();
        match templates.get(&config.kind) {
            None => errors.push(format!("unknown agent kind: {}", config.kind)),
            Some(template) => {
                for cap in &config.capabilities {
                    if !template.required_capabilities.contains(cap) {
                        errors.push(format!(
                            "capability {} is not covered by the {} template",
                            cap, config.kind
                        ));
                    }
                }
                if !template.supported_tags.is_empty() {
                    for tag in &config.tags {
                        if !template.supported_tags.contains(tag) {
                            errors.push(format!(
                                "tag {} is not supported by the {} template",
                                tag, config.kind
                            ));
                        }
                    }
                }
            }
        }
        ConfigValidation {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Fill config gaps from the configured agent defaults.
    fn effective(&self, config: &AgentConfig) -> AgentConfig {
        let mut config = config.clone();
        if config.version.is_none() {
            config.version = Some(self.defaults.version.clone());
        }
        if config.temperature.is_none() {
            config.temperature = Some(self.defaults.temperature);
        }
        if config.max_tokens.is_none() {
            config.max_tokens = Some(self.defaults.max_tokens);
        }
        config
    }
}

/// Recover the member kind from an instance's tags. Team members always
/// carry their kind tag.
fn kind_from_tags(tags: &[String]) -> AgentKind {
    for tag in tags {
        match tag.as_str() {
            "classification" => return AgentKind::Classification,
            "ideation" => return AgentKind::Ideation,
            "grading" => return AgentKind::Grading,
            "improvement" => return AgentKind::Improvement,
            _ => {}
        }
    }
    AgentKind::Custom("unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Completion, CompletionRequest};
    use crate::registry::RegistryConfig;
    use async_trait::async_trait;

    struct StaticClient;

    #[async_trait]
    impl CompletionClient for StaticClient {
        async fn complete(&self, _: &CompletionRequest) -> Result<Completion> {
            Ok(Completion::new("{}"))
        }
        fn model_name(&self) -> &str {
            "mock-model"
        }
    }

    fn test_factory() -> AgentFactory {
        let registry = Arc::new(AgentRegistry::new(RegistryConfig::default()));
        AgentFactory::with_builtin_templates(
            registry,
            Arc::new(StaticClient),
            AgentDefaults::default(),
        )
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let factory = test_factory();
        let config = AgentConfig::new(AgentKind::Custom("auditor".to_string()));
        let err = factory.create_agent(&config).err().unwrap();
        assert!(matches!(err, ProctorError::UnknownAgentKind(kind) if kind == "auditor"));
    }

    #[test]
    fn builtin_templates_cover_the_team() {
        let factory = test_factory();
        for kind in TEAM_KINDS {
            assert!(factory.has_template(&kind), "missing template for {kind}");
        }
    }

    #[test]
    fn validate_config_checks_capability_subset() {
        let factory = test_factory();

        let ok = factory.validate_config(
            &AgentConfig::new(AgentKind::Classification)
                .with_capabilities(vec![CapabilityKind::DocumentClassification]),
        );
        assert!(ok.valid, "errors: {:?}", ok.errors);

        let bad = factory.validate_config(
            &AgentConfig::new(AgentKind::Classification)
                .with_capabilities(vec![CapabilityKind::DocumentRewrite]),
        );
        assert!(!bad.valid);
        assert_eq!(bad.errors.len(), 1);
    }

    #[test]
    fn create_is_permissive_about_capabilities() {
        let factory = test_factory();
        // Mismatched capabilities warn but do not fail.
        let agent = factory
            .create_agent(
                &AgentConfig::new(AgentKind::Classification)
                    .with_capabilities(vec![CapabilityKind::DocumentRewrite]),
            )
            .unwrap();
        assert!(!agent.metadata().id.is_empty());
    }

    #[test]
    fn template_registration_is_an_upsert() {
        let factory = test_factory();
        let replacement = AgentTemplate::new(
            AgentKind::Classification,
            "replacement blueprint",
            |config, client| Ok(Arc::new(ClassificationAgent::new(config, client))),
        );
        factory.register_template(replacement);
        assert!(factory.has_template(&AgentKind::Classification));
        assert_eq!(factory.template_kinds().len(), 4);
    }
}
