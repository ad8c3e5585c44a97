//! Mock implementations for testing.
//!
//! Scripted agents and completion clients shared across the integration
//! test files, so registry and scheduler behavior can be exercised without
//! a model behind them.

// Each test binary compiles its own copy, so not every helper is used
// from every file.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use proctor::agents::Agent;
use proctor::llm::{Completion, CompletionClient, CompletionRequest};
use proctor::types::{
    AgentContext, AgentHealth, AgentMetadata, AgentOutput, CapabilityDescriptor, CapabilityKind,
    ExecutionFailure, Result,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Mock completion client with a scripted reply.
///
/// # Examples
///
/// ```ignore
/// // A client that always answers with the given text
/// let client = MockCompletionClient::new(r#"{"category": "policy"}"#);
///
/// // A client that always fails
/// let client = MockCompletionClient::failing();
/// ```
#[derive(Clone)]
pub struct MockCompletionClient {
    reply: String,
    should_fail: bool,
}

impl MockCompletionClient {
    /// Client that answers every request with `reply`.
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            should_fail: false,
        }
    }

    /// Client that fails every request.
    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            should_fail: true,
        }
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<Completion> {
        if self.should_fail {
            return Err(
                ExecutionFailure::upstream_unavailable("mock completion failure").into(),
            );
        }
        Ok(Completion::new(self.reply.clone()).with_tokens(Some(7)))
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Scripted agent for exercising lifecycle, scheduling and health paths.
///
/// Behavior is set up front through the builder methods; counters and the
/// health flag stay adjustable after the agent has been registered.
pub struct MockAgent {
    metadata: AgentMetadata,
    output: Value,
    latency: Option<Duration>,
    failures_remaining: AtomicUsize,
    always_fail: bool,
    fail_initialize: AtomicBool,
    healthy: AtomicBool,
    executions: AtomicUsize,
    seen: Mutex<Vec<Value>>,
}

impl MockAgent {
    /// Well-behaved agent with the given registry id.
    pub fn new(id: &str) -> Self {
        let metadata = AgentMetadata {
            id: id.to_string(),
            name: format!("mock {id}"),
            description: "scripted test agent".to_string(),
            version: "0.0.1".to_string(),
            capabilities: vec![CapabilityDescriptor::new(
                CapabilityKind::DocumentClassification,
                "scripted",
            )],
            dependencies: vec![],
            tags: vec!["mock".to_string()],
        };
        Self {
            metadata,
            output: json!({"ok": true}),
            latency: None,
            failures_remaining: AtomicUsize::new(0),
            always_fail: false,
            fail_initialize: AtomicBool::new(false),
            healthy: AtomicBool::new(true),
            executions: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Fixed payload returned from every successful execution.
    pub fn with_output(mut self, output: Value) -> Self {
        self.output = output;
        self
    }

    /// Sleep this long inside every execution and health check.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.metadata.tags.push(tag.to_string());
        self
    }

    pub fn with_capability(mut self, kind: CapabilityKind) -> Self {
        self.metadata
            .capabilities
            .push(CapabilityDescriptor::new(kind, "scripted"));
        self
    }

    /// Every execution fails.
    pub fn failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    /// The first `n` executions fail, the rest succeed.
    pub fn failing_times(self, n: usize) -> Self {
        self.failures_remaining.store(n, Ordering::Relaxed);
        self
    }

    /// `initialize` fails, leaving the agent in error status on register.
    pub fn with_failing_initialize(self) -> Self {
        self.fail_initialize.store(true, Ordering::Relaxed);
        self
    }

    /// Flip whether `initialize` fails; restart tests recover through this.
    pub fn set_initialize_fails(&self, fails: bool) {
        self.fail_initialize.store(fails, Ordering::Relaxed);
    }

    /// Flip the health verdict reported by `health_check`.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    /// Executions attempted so far.
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::Relaxed)
    }

    /// Payloads received, in execution order.
    pub fn seen(&self) -> Vec<Value> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn metadata(&self) -> &AgentMetadata {
        &self.metadata
    }

    async fn initialize(&self) -> Result<()> {
        if self.fail_initialize.load(Ordering::Relaxed) {
            return Err(ExecutionFailure::internal("mock initialization failure").into());
        }
        Ok(())
    }

    async fn execute(&self, input: &Value, _context: &AgentContext) -> Result<AgentOutput> {
        self.executions.fetch_add(1, Ordering::Relaxed);
        self.seen.lock().push(input.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.always_fail {
            return Err(ExecutionFailure::internal("mock execution failure").into());
        }
        let remaining = self.failures_remaining.load(Ordering::Relaxed);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::Relaxed);
            return Err(ExecutionFailure::internal("mock execution failure").into());
        }
        Ok(AgentOutput::new(self.output.clone()))
    }

    async fn health_check(&self) -> Result<AgentHealth> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.healthy.load(Ordering::Relaxed) {
            Ok(AgentHealth::healthy())
        } else {
            Ok(AgentHealth::unhealthy("mock marked unhealthy"))
        }
    }
}
