//! Agent registry: the live set of agent instances, lifecycle and health
//! tracking, discovery, and the bounded execution gate.
//!
//! # Architecture
//!
//! The registry owns every [`AgentInstance`] in the process. Admission to
//! execution is controlled by one global semaphore shared across all agents;
//! per-agent `busy` status is informational occupancy, never a lock. A
//! background sweep refreshes health records on a timer.
//!
//! # Example
//!
//! ```rust,ignore
//! use proctor::registry::{AgentRegistry, RegistryConfig};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(AgentRegistry::new(RegistryConfig::default()));
//! registry.register(agent).await?;
//!
//! let output = registry
//!     .execute_agent("classification-p1", input, context)
//!     .await?;
//! let _sweeper = registry.start_health_loop();
//! ```

pub mod instance;

use crate::agents::Agent;
use crate::types::{
    AgentContext, AgentHealth, AgentOutput, AgentStatus, CapabilityKind, ExecutionFailure,
    HealthState, ProctorError, Result,
};
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

pub use instance::{AgentInstance, AgentSnapshot, HealthRecord, UsageStats};

/// Configuration for the agent registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum executions in flight across all agents (default: 10)
    pub max_concurrent_executions: usize,

    /// How often the background health sweep runs (default: 60 seconds)
    pub health_check_interval: Duration,

    /// Deadline for a single agent's health check (default: 10 seconds)
    pub health_check_timeout: Duration,

    /// Deadline for a single execution; `None` disables it (default: 120 seconds)
    pub execution_timeout: Option<Duration>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_concurrent_executions: 10,
            health_check_interval: Duration::from_secs(60),
            health_check_timeout: Duration::from_secs(10),
            execution_timeout: Some(Duration::from_secs(120)), // 2 minutes
        }
    }
}

impl RegistryConfig {
    /// Set the global execution concurrency cap
    pub fn with_max_concurrent_executions(mut self, max: usize) -> Self {
        self.max_concurrent_executions = max;
        self
    }

    /// Set the health sweep cadence
    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    /// Set the per-check health deadline
    pub fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }

    /// Set the per-execution deadline
    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = Some(timeout);
        self
    }

    /// Let executions run unbounded (useful for long-running analyses)
    pub fn without_execution_timeout(mut self) -> Self {
        self.execution_timeout = None;
        self
    }
}

/// Filters for [`AgentRegistry::discover`]. Empty filters pass everything;
/// within one filter any listed value may match, across filters all must.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryQuery {
    pub capabilities: Vec<CapabilityKind>,
    pub tags: Vec<String>,
    pub statuses: Vec<AgentStatus>,
}

impl DiscoveryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capability(mut self, capability: CapabilityKind) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.statuses.push(status);
        self
    }

    fn matches(&self, snapshot: &AgentSnapshot) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&snapshot.status) {
            return false;
        }
        if !self.tags.is_empty()
            && !self.tags.iter().any(|tag| snapshot.metadata.tags.contains(tag))
        {
            return false;
        }
        if !self.capabilities.is_empty() {
            let advertised = |cap: &CapabilityKind| {
                snapshot
                    .metadata
                    .capabilities
                    .iter()
                    .any(|desc| desc.kind == *cap)
            };
            if !self.capabilities.iter().any(advertised) {
                return false;
            }
        }
        true
    }
}

/// Aggregate view over the whole registry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemStatus {
    pub total_agents: usize,
    pub initializing: usize,
    pub ready: usize,
    pub busy: usize,
    pub error: usize,
    pub stopped: usize,
    pub active_executions: u32,
    pub total_executions: u64,
    /// Mean execution time across all agents, weighted by execution count.
    pub average_execution_ms: f64,
    pub overall_success_rate: f64,
}

/// Registry of live agent instances.
///
/// All lifecycle transitions, execution admission and health bookkeeping go
/// through here. Shared state sits behind short critical sections; no lock
/// is held across an await.
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Arc<AgentInstance>>>,
    /// Global admission gate for executions, shared across all agents.
    execution_slots: Arc<Semaphore>,
    config: RegistryConfig,
    shutdown: AtomicBool,
}

impl AgentRegistry {
    /// Create a registry with the given configuration
    pub fn new(config: RegistryConfig) -> Self {
        let execution_slots = Arc::new(Semaphore::new(config.max_concurrent_executions));
        Self {
            agents: RwLock::new(HashMap::new()),
            execution_slots,
            config,
            shutdown: AtomicBool::new(false),
        }
    }

    /// Create a registry with default configuration
    pub fn with_defaults() -> Self {
        Self::new(RegistryConfig::default())
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ============= Lifecycle =============

    /// Register an agent and run its initialization.
    ///
    /// The id is claimed (status `initializing`) before `initialize()` is
    /// awaited, so a concurrent duplicate registration fails fast. On
    /// initialization failure the instance stays registered in `error`
    /// status and the failure is returned to the caller.
    pub async fn register(&self, agent: Arc<dyn Agent>) -> Result<()> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(ProctorError::ShutDown);
        }

        let instance = Arc::new(AgentInstance::new(agent));
        let id = instance.id().to_string();
        {
            let mut agents = self.agents.write();
            if agents.contains_key(&id) {
                return Err(ProctorError::DuplicateAgent(id));
            }
            agents.insert(id.clone(), Arc::clone(&instance));
        }

        debug!(agent_id = %id, "agent registered, initializing");
        match instance.agent().initialize().await {
            Ok(()) => {
                instance.set_status(AgentStatus::Ready);
                info!(agent_id = %id, "agent ready");
                Ok(())
            }
            Err(e) => {
                instance.set_status(AgentStatus::Error);
                error!(agent_id = %id, error = %e, "agent initialization failed");
                Err(ProctorError::Initialization {
                    id,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Remove an agent from the registry. In-flight executions run to
    /// completion on their own handle; the instance just stops accepting
    /// new work.
    pub fn unregister(&self, id: &str) -> Result<()> {
        let instance = self
            .agents
            .write()
            .remove(id)
            .ok_or_else(|| ProctorError::AgentNotFound(id.to_string()))?;
        instance.set_status(AgentStatus::Stopped);
        info!(agent_id = %id, "agent unregistered");
        Ok(())
    }

    /// `ready` → `stopped`. Rejected while the agent has work in flight.
    pub fn pause_agent(&self, id: &str) -> Result<()> {
        let instance = self.instance(id)?;
        instance.pause()?;
        info!(agent_id = %id, "agent paused");
        Ok(())
    }

    /// `stopped` → `ready`.
    pub fn resume_agent(&self, id: &str) -> Result<()> {
        let instance = self.instance(id)?;
        instance.resume()?;
        info!(agent_id = %id, "agent resumed");
        Ok(())
    }

    /// Re-initialize an errored agent: `error` → `initializing` → `ready`,
    /// or back to `error` if initialization fails again.
    pub async fn restart_agent(&self, id: &str) -> Result<()> {
        let instance = self.instance(id)?;
        instance.begin_restart()?;
        debug!(agent_id = %id, "restarting agent");
        match instance.agent().initialize().await {
            Ok(()) => {
                instance.set_status(AgentStatus::Ready);
                info!(agent_id = %id, "agent restarted");
                Ok(())
            }
            Err(e) => {
                instance.set_status(AgentStatus::Error);
                error!(agent_id = %id, error = %e, "agent restart failed");
                Err(ProctorError::Initialization {
                    id: id.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    // ============= Execution =============

    /// Execute an agent through the global admission gate.
    ///
    /// Fails fast on unknown ids and on `stopped`/`error` agents, then waits
    /// for an execution slot. The optional per-execution deadline converts a
    /// hung call into a `timeout` failure instead of pinning a slot forever.
    pub async fn execute_agent(
        &self,
        id: &str,
        input: Value,
        context: AgentContext,
    ) -> Result<AgentOutput> {
        let instance = self.instance(id)?;
        let status = instance.status();
        if matches!(status, AgentStatus::Stopped | AgentStatus::Error) {
            return Err(ProctorError::AgentUnavailable {
                id: id.to_string(),
                status,
            });
        }
        let context = context.normalized();

        let _permit = Arc::clone(&self.execution_slots)
            .acquire_owned()
            .await
            .map_err(|_| ProctorError::ShutDown)?;

        // Re-check under the instance lock; the agent may have been stopped
        // while this execution waited for a slot.
        let _guard = instance.begin_execution()?;

        debug!(
            agent_id = %id,
            project_id = %context.project_id,
            session_id = %context.session_id,
            "execution started"
        );
        let started = Instant::now();

        let result = match self.config.execution_timeout {
            Some(deadline) => {
                match tokio::time::timeout(deadline, instance.agent().execute(&input, &context))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ExecutionFailure::timeout(format!(
                        "execution exceeded {}s deadline",
                        deadline.as_secs()
                    ))
                    .into()),
                }
            }
            None => instance.agent().execute(&input, &context).await,
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        instance.record_execution(result.is_ok(), elapsed_ms);

        match result {
            Ok(output) => {
                debug!(agent_id = %id, elapsed_ms, "execution completed");
                Ok(output)
            }
            Err(e) => {
                error!(
                    agent_id = %id,
                    error = %e,
                    elapsed_ms,
                    project_id = %context.project_id,
                    user_id = %context.user_id,
                    session_id = %context.session_id,
                    input = %input,
                    "execution failed"
                );
                Err(e)
            }
        }
    }

    // ============= Health =============

    /// Run one agent's health check, record and return the verdict.
    pub async fn health_check(&self, id: &str) -> Result<HealthRecord> {
        let instance = self.instance(id)?;
        Ok(self.check_instance(&instance).await)
    }

    /// Sweep every registered agent concurrently. Individual failures and
    /// timeouts become `unhealthy` records; the sweep itself never fails.
    pub async fn health_check_all(&self) -> HashMap<String, HealthRecord> {
        let instances: Vec<Arc<AgentInstance>> = self.agents.read().values().cloned().collect();
        let checks = instances.iter().map(|instance| self.check_instance(instance));
        let records = join_all(checks).await;
        instances
            .iter()
            .map(|instance| instance.id().to_string())
            .zip(records)
            .collect()
    }

    async fn check_instance(&self, instance: &Arc<AgentInstance>) -> HealthRecord {
        let verdict = tokio::time::timeout(
            self.config.health_check_timeout,
            instance.agent().health_check(),
        )
        .await;

        let health = match verdict {
            Ok(Ok(health)) => health,
            Ok(Err(e)) => AgentHealth::unhealthy(format!("health check failed: {e}")),
            Err(_) => AgentHealth::unhealthy(format!(
                "health check timed out after {}s",
                self.config.health_check_timeout.as_secs()
            )),
        };
        if health.state != HealthState::Healthy {
            warn!(
                agent_id = %instance.id(),
                state = %health.state,
                detail = health.detail.as_deref().unwrap_or(""),
                "agent health degraded"
            );
        }
        instance.record_health(health)
    }

    /// Start the background health sweep.
    ///
    /// The task runs until the registry is shut down.
    pub fn start_health_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.health_check_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval_timer.tick().await;

                if registry.shutdown.load(Ordering::Relaxed) {
                    break;
                }

                let records = registry.health_check_all().await;
                debug!(checked = records.len(), "health sweep completed");
            }
        })
    }

    // ============= Discovery =============

    /// Query agents by capability, tag and status. Results are ordered ready
    /// first, then by success rate descending, so the front of the list is
    /// the best candidate to hand work to.
    pub fn discover(&self, query: &DiscoveryQuery) -> Vec<AgentSnapshot> {
        let mut snapshots: Vec<AgentSnapshot> = self
            .agents
            .read()
            .values()
            .map(|instance| instance.snapshot())
            .filter(|snapshot| query.matches(snapshot))
            .collect();

        snapshots.sort_by(|a, b| {
            let a_ready = a.status == AgentStatus::Ready;
            let b_ready = b.status == AgentStatus::Ready;
            b_ready.cmp(&a_ready).then_with(|| {
                b.usage
                    .success_rate()
                    .partial_cmp(&a.usage.success_rate())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        });
        snapshots
    }

    /// Snapshots of every registered agent, unordered.
    pub fn list(&self) -> Vec<AgentSnapshot> {
        self.agents
            .read()
            .values()
            .map(|instance| instance.snapshot())
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<AgentSnapshot> {
        Ok(self.instance(id)?.snapshot())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.read().contains_key(id)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.read().len()
    }

    /// Current status of an agent, `None` for unknown ids.
    pub fn agent_status(&self, id: &str) -> Option<AgentStatus> {
        self.agents.read().get(id).map(|instance| instance.status())
    }

    /// Aggregate counts and execution statistics across the registry.
    pub fn system_status(&self) -> SystemStatus {
        let snapshots = self.list();
        let mut status = SystemStatus {
            total_agents: snapshots.len(),
            ..SystemStatus::default()
        };

        let mut successful: u64 = 0;
        let mut weighted_ms = 0.0;
        for snapshot in &snapshots {
            match snapshot.status {
                AgentStatus::Initializing => status.initializing += 1,
                AgentStatus::Ready => status.ready += 1,
                AgentStatus::Busy => status.busy += 1,
                AgentStatus::Error => status.error += 1,
                AgentStatus::Stopped => status.stopped += 1,
            }
            status.active_executions += snapshot.active_executions;
            status.total_executions += snapshot.usage.total_executions;
            successful += snapshot.usage.successful_executions;
            weighted_ms +=
                snapshot.usage.average_duration_ms * snapshot.usage.total_executions as f64;
        }
        if status.total_executions > 0 {
            status.average_execution_ms = weighted_ms / status.total_executions as f64;
            status.overall_success_rate = successful as f64 / status.total_executions as f64;
        }
        status
    }

    // ============= Shutdown =============

    /// Stop accepting work and drain the registry. Idempotent.
    ///
    /// In-flight executions already hold their permits and guards and run to
    /// completion; waiters on the admission gate fail, and every instance is
    /// marked stopped and removed.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::Relaxed) {
            return;
        }
        self.execution_slots.close();

        let mut agents = self.agents.write();
        for instance in agents.values() {
            instance.set_status(AgentStatus::Stopped);
        }
        let drained = agents.len();
        agents.clear();
        info!(drained, "agent registry shut down");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn instance(&self, id: &str) -> Result<Arc<AgentInstance>> {
        self.agents
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ProctorError::AgentNotFound(id.to_string()))
    }
}
