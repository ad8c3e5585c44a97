//! # Proctor - Agent Lifecycle & Execution Coordination
//!
//! The agent core of a compliance document analysis platform: typed agent
//! capabilities, a factory for standing up per-project agent teams, a
//! registry tracking lifecycle, health and usage, and a prioritized task
//! queue with dependency-aware scheduling.
//!
//! ## Overview
//!
//! Four specialist agents analyze compliance documents:
//!
//! - **Classification** - identify document type and map it to frameworks
//! - **Ideation** - propose compliance improvements against found gaps
//! - **Grading** - score a document against a named framework
//! - **Improvement** - rewrite guidance driven by prior findings
//!
//! All of them speak through one [`CompletionClient`](llm::CompletionClient)
//! boundary, so any model backend (or a scripted test double) plugs in
//! without touching agent code.
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! proctor-core = "0.1"
//! ```
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use proctor::runtime::AgentRuntime;
//! use proctor::tasks::{TaskOptions, TaskPriority};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> proctor::Result<()> {
//!     // Any CompletionClient implementation works here
//!     let client = Arc::new(MyModelClient::default());
//!     let runtime = AgentRuntime::with_defaults(client);
//!     runtime.start();
//!
//!     // Stand up a team of agents for a project
//!     let team = runtime.factory().create_project_team("acme-soc2").await;
//!     assert!(team.is_complete());
//!
//!     // Run a classification and wait for the verdict
//!     let verdict = runtime
//!         .scheduler()
//!         .run_coordinated(
//!             "classification-acme-soc2",
//!             json!({"document_id": "doc-1", "content": "..."}),
//!             TaskOptions::new().with_priority(TaskPriority::High),
//!         )
//!         .await?;
//!     println!("{verdict}");
//!
//!     runtime.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ### Discovering Agents
//!
//! ```rust,ignore
//! use proctor::registry::DiscoveryQuery;
//! use proctor::types::CapabilityKind;
//!
//! // Ready graders for this project, best success rate first
//! let candidates = runtime.registry().discover(
//!     &DiscoveryQuery::new()
//!         .with_capability(CapabilityKind::ComplianceScoring)
//!         .with_tag("project:acme-soc2"),
//! );
//! ```
//!
//! ## Modules
//!
//! - [`agents`] - The agent contract, the four specialists, and the factory
//! - [`llm`] - Model invocation boundary
//! - [`registry`] - Live agent instances: lifecycle, health, discovery
//! - [`tasks`] - Prioritized task queue and scheduler
//! - [`runtime`] - One handle wiring everything together
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration and logging
//!
//! ## Architecture
//!
//! Execution admission is one bounded gate shared by every agent; an
//! agent's `busy` status is occupancy information, never a lock. Health
//! sweeps and queue drains run as background tasks owned by the runtime,
//! and every component takes its collaborators through its constructor.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Agent contract, specialist implementations, and the factory.
pub mod agents;
/// Model invocation boundary.
pub mod llm;
/// Agent instance registry: lifecycle, health, discovery.
pub mod registry;
/// Runtime wiring for hosts.
pub mod runtime;
/// Prioritized task queue and scheduler.
pub mod tasks;
/// Core types (capabilities, contexts, errors).
pub mod types;
/// Configuration and logging utilities.
pub mod utils;

// Re-export commonly used types
pub use agents::{Agent, AgentConfig, AgentFactory, AgentTemplate, ConfigValidation, TeamReport};
pub use llm::{Completion, CompletionClient, CompletionRequest};
pub use registry::{AgentRegistry, AgentSnapshot, DiscoveryQuery, RegistryConfig, SystemStatus};
pub use runtime::{AgentRuntime, AgentRuntimeBuilder};
pub use tasks::{
    QueuedTask, SchedulerConfig, TaskId, TaskOptions, TaskPriority, TaskResolution, TaskScheduler,
    TaskStatus,
};
pub use types::{
    AgentContext, AgentKind, AgentMetadata, AgentOutput, AgentStatus, CapabilityDescriptor,
    CapabilityKind, ProctorError, Result,
};
pub use utils::ProctorConfig;
