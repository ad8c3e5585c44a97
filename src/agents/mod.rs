//! Agent framework: the capability contract, the built-in analysis agents
//! and the factory that assembles them.

pub mod classification;
pub mod factory;
pub mod grading;
pub mod ideation;
pub mod improvement;

use crate::types::{AgentContext, AgentHealth, AgentMetadata, AgentOutput, ExecutionFailure, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

// Re-export commonly used types
pub use classification::ClassificationAgent;
pub use factory::{
    AgentConfig, AgentFactory, AgentTemplate, ConfigValidation, TeamMemberOutcome, TeamReport,
};
pub use grading::GradingAgent;
pub use ideation::IdeationAgent;
pub use improvement::ImprovementAgent;

/// Base trait for all agents.
///
/// Implementations are expected to be well behaved: report failures as
/// structured [`ExecutionFailure`](crate::types::ExecutionFailure)s instead
/// of panicking, and keep `health_check` cheap enough to run on a timer.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Immutable identity and capability set.
    fn metadata(&self) -> &AgentMetadata;

    /// One-time setup (template loading, connection warming). Idempotent:
    /// repeat calls are no-ops.
    async fn initialize(&self) -> Result<()>;

    /// Execute one unit of work with the given input payload and context.
    async fn execute(&self, input: &Value, context: &AgentContext) -> Result<AgentOutput>;

    /// Self-diagnosis, runs on the registry's health timer.
    async fn health_check(&self) -> Result<AgentHealth>;
}

/// Deserialize a task payload into an agent's input contract. Unknown fields
/// pass through, missing required fields become `InvalidInput` failures.
pub(crate) fn parse_input<T: DeserializeOwned>(input: &Value) -> Result<T> {
    serde_json::from_value(input.clone())
        .map_err(|e| ExecutionFailure::invalid_input(format!("malformed payload: {e}")).into())
}
