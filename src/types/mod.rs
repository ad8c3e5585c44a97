use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ============= Capability & Framework Types =============

/// Typed capability identifiers advertised by agents and matched at discovery.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    DocumentClassification,
    FrameworkMapping,
    ComplianceScoring,
    GapAnalysis,
    ControlIdeation,
    RemediationPlanning,
    DocumentRewrite,
}

impl CapabilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::DocumentClassification => "document_classification",
            CapabilityKind::FrameworkMapping => "framework_mapping",
            CapabilityKind::ComplianceScoring => "compliance_scoring",
            CapabilityKind::GapAnalysis => "gap_analysis",
            CapabilityKind::ControlIdeation => "control_ideation",
            CapabilityKind::RemediationPlanning => "remediation_planning",
            CapabilityKind::DocumentRewrite => "document_rewrite",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single capability an agent offers. Contracts are informational and
/// describe the expected payload shapes for human readers and UIs.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CapabilityDescriptor {
    pub kind: CapabilityKind,
    pub description: String,
    pub input_contract: String,
    pub output_contract: String,
}

impl CapabilityDescriptor {
    pub fn new(kind: CapabilityKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            input_contract: String::new(),
            output_contract: String::new(),
        }
    }

    pub fn with_contracts(
        mut self,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        self.input_contract = input.into();
        self.output_contract = output.into();
        self
    }
}

/// Compliance frameworks the analysis agents understand.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Ferpa,
    Hipaa,
    Gdpr,
    Itar,
    Cmmc,
    Soc2,
}

impl Framework {
    pub const ALL: [Framework; 6] = [
        Framework::Ferpa,
        Framework::Hipaa,
        Framework::Gdpr,
        Framework::Itar,
        Framework::Cmmc,
        Framework::Soc2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Ferpa => "ferpa",
            Framework::Hipaa => "hipaa",
            Framework::Gdpr => "gdpr",
            Framework::Itar => "itar",
            Framework::Cmmc => "cmmc",
            Framework::Soc2 => "soc2",
        }
    }

    /// Case-insensitive lookup, used when payloads carry framework names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ferpa" => Some(Framework::Ferpa),
            "hipaa" => Some(Framework::Hipaa),
            "gdpr" => Some(Framework::Gdpr),
            "itar" => Some(Framework::Itar),
            "cmmc" => Some(Framework::Cmmc),
            "soc2" | "soc-2" => Some(Framework::Soc2),
            _ => None,
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============= Agent Identity Types =============

/// Agent blueprint identifiers. The four built-in kinds cover the document
/// analysis pipeline; `Custom` keeps the template space open for host
/// applications that register their own blueprints.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(into = "String", from = "String")]
pub enum AgentKind {
    Classification,
    Ideation,
    Grading,
    Improvement,
    Custom(String),
}

impl AgentKind {
    pub fn as_str(&self) -> &str {
        match self {
            AgentKind::Classification => "classification",
            AgentKind::Ideation => "ideation",
            AgentKind::Grading => "grading",
            AgentKind::Improvement => "improvement",
            AgentKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for AgentKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "classification" => AgentKind::Classification,
            "ideation" => AgentKind::Ideation,
            "grading" => AgentKind::Grading,
            "improvement" => AgentKind::Improvement,
            _ => AgentKind::Custom(s),
        }
    }
}

impl From<AgentKind> for String {
    fn from(kind: AgentKind) -> Self {
        kind.as_str().to_owned()
    }
}

/// Immutable identity an agent carries from construction to removal.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AgentMetadata {
    /// Unique id, the registry key.
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub capabilities: Vec<CapabilityDescriptor>,
    /// External services the agent relies on, informational.
    pub dependencies: Vec<String>,
    pub tags: Vec<String>,
}

// ============= Lifecycle & Health Types =============

/// Registry-side lifecycle state of an agent instance.
///
/// `Busy` is an occupancy indicator, not a lock: a busy agent still accepts
/// further executions, admission is controlled only by the global gate.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Initializing,
    Ready,
    Busy,
    Error,
    Stopped,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Initializing => "initializing",
            AgentStatus::Ready => "ready",
            AgentStatus::Busy => "busy",
            AgentStatus::Error => "error",
            AgentStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::Unhealthy => "unhealthy",
        };
        f.write_str(s)
    }
}

/// Self-reported health of an agent, produced by `Agent::health_check`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AgentHealth {
    pub state: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AgentHealth {
    pub fn healthy() -> Self {
        Self {
            state: HealthState::Healthy,
            detail: None,
        }
    }

    pub fn degraded(detail: impl Into<String>) -> Self {
        Self {
            state: HealthState::Degraded,
            detail: Some(detail.into()),
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            state: HealthState::Unhealthy,
            detail: Some(detail.into()),
        }
    }
}

// ============= Execution Types =============

/// Per-execution context threaded through every agent call.
#[derive(Debug, Clone, Default)]
pub struct AgentContext {
    pub project_id: String,
    pub user_id: String,
    pub session_id: String,
    pub history: Vec<Message>,
    pub shared_state: HashMap<String, Value>,
}

impl AgentContext {
    pub fn for_project(project_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Fills defaults for missing fields so downstream logging and tracking
    /// always have values: unknown project, anonymous user, fresh session id.
    pub fn normalized(&self) -> Self {
        let mut ctx = self.clone();
        if ctx.project_id.is_empty() {
            ctx.project_id = "unknown".to_string();
        }
        if ctx.user_id.is_empty() {
            ctx.user_id = "anonymous".to_string();
        }
        if ctx.session_id.is_empty() {
            ctx.session_id = format!("session-{}", Uuid::new_v4());
        }
        ctx
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Structured result of a successful agent execution.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AgentOutput {
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
}

impl AgentOutput {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            tokens_used: None,
        }
    }

    /// Wraps raw model text: parsed as JSON when it is JSON, otherwise
    /// carried under a `text` key.
    pub fn from_text(text: &str) -> Self {
        let data = serde_json::from_str::<Value>(text.trim())
            .unwrap_or_else(|_| serde_json::json!({ "text": text }));
        Self::new(data)
    }

    pub fn with_tokens(mut self, tokens: Option<u32>) -> Self {
        self.tokens_used = tokens;
        self
    }
}

// ============= Error Types =============

/// Execution failure classes. The boundary to the model API is out of scope,
/// so upstream conditions arrive pre-classified by the client implementation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    UpstreamUnavailable,
    Timeout,
    InvalidInput,
    Internal,
}

impl FailureKind {
    /// Whether a retry has a chance of succeeding.
    pub fn recoverable(&self) -> bool {
        matches!(
            self,
            FailureKind::RateLimited | FailureKind::UpstreamUnavailable | FailureKind::Timeout
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::RateLimited => "rate_limited",
            FailureKind::UpstreamUnavailable => "upstream_unavailable",
            FailureKind::Timeout => "timeout",
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error, Clone)]
#[error("{kind}: {message}")]
pub struct ExecutionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ExecutionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidInput, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(FailureKind::RateLimited, message)
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::UpstreamUnavailable, message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProctorError {
    #[error("agent already registered: {0}")]
    DuplicateAgent(String),

    #[error("no template registered for agent kind: {0}")]
    UnknownAgentKind(String),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("agent {id} is not accepting work (status: {status})")]
    AgentUnavailable { id: String, status: AgentStatus },

    #[error("cannot {operation} agent {id} while {status}")]
    InvalidState {
        id: String,
        status: AgentStatus,
        operation: &'static str,
    },

    #[error("agent {id} failed to initialize: {reason}")]
    Initialization { id: String, reason: String },

    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionFailure),

    #[error("task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("unknown dependency task: {0}")]
    UnknownDependency(Uuid),

    #[error("task {id} failed: {message}")]
    TaskFailed { id: Uuid, message: String },

    #[error("runtime is shutting down")]
    ShutDown,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ProctorError {
    /// Execution failure class, when this error wraps one.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ProctorError::Execution(failure) => Some(failure.kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProctorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_normalization_fills_defaults() {
        let ctx = AgentContext::default().normalized();
        assert_eq!(ctx.project_id, "unknown");
        assert_eq!(ctx.user_id, "anonymous");
        assert!(ctx.session_id.starts_with("session-"));
    }

    #[test]
    fn context_normalization_keeps_existing_values() {
        let mut ctx = AgentContext::for_project("proj-1", "user-1");
        ctx.history.push(Message {
            role: MessageRole::User,
            content: "summarize the gaps".to_string(),
            timestamp: Utc::now(),
        });
        let normalized = ctx.normalized();
        assert_eq!(normalized.project_id, "proj-1");
        assert_eq!(normalized.user_id, "user-1");
        assert!(!normalized.session_id.is_empty());
        assert_eq!(normalized.history.len(), 1);
    }

    #[test]
    fn agent_kind_round_trips_through_strings() {
        assert_eq!(AgentKind::from("grading".to_string()), AgentKind::Grading);
        assert_eq!(
            AgentKind::from("auditor".to_string()),
            AgentKind::Custom("auditor".to_string())
        );
        assert_eq!(String::from(AgentKind::Classification), "classification");
    }

    #[test]
    fn framework_parse_is_case_insensitive() {
        assert_eq!(Framework::parse("FERPA"), Some(Framework::Ferpa));
        assert_eq!(Framework::parse("Soc-2"), Some(Framework::Soc2));
        assert_eq!(Framework::parse("pci"), None);
    }

    #[test]
    fn recoverable_failures_are_the_transient_ones() {
        assert!(FailureKind::RateLimited.recoverable());
        assert!(FailureKind::UpstreamUnavailable.recoverable());
        assert!(FailureKind::Timeout.recoverable());
        assert!(!FailureKind::InvalidInput.recoverable());
        assert!(!FailureKind::Internal.recoverable());
    }

    #[test]
    fn output_from_text_parses_json_payloads() {
        let output = AgentOutput::from_text(r#"{"score": 0.8}"#);
        assert_eq!(output.data["score"], 0.8);

        let output = AgentOutput::from_text("not json");
        assert_eq!(output.data["text"], "not json");
    }
}
