//! Per-agent bookkeeping: lifecycle status, execution occupancy, usage
//! statistics and the last health verdict.

use crate::agents::Agent;
use crate::types::{AgentHealth, AgentMetadata, AgentStatus, ProctorError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// Mutable lifecycle state. Status and the occupancy counter move together
/// under one lock so the 0→1 and 1→0 transitions stay atomic.
#[derive(Debug, Clone, Copy)]
struct InstanceState {
    status: AgentStatus,
    active_executions: u32,
}

/// Cumulative execution statistics for one agent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageStats {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    /// Running average over all executions, in milliseconds.
    pub average_duration_ms: f64,
    pub last_execution_at: Option<DateTime<Utc>>,
}

impl UsageStats {
    /// Fold one finished execution into the stats.
    fn record(&mut self, success: bool, duration_ms: f64) {
        self.total_executions += 1;
        if success {
            self.successful_executions += 1;
        } else {
            self.failed_executions += 1;
        }
        let n = self.total_executions as f64;
        self.average_duration_ms = (self.average_duration_ms * (n - 1.0) + duration_ms) / n;
        self.last_execution_at = Some(Utc::now());
    }

    /// Fraction of executions that succeeded; 0.0 before the first one.
    pub fn success_rate(&self) -> f64 {
        if self.total_executions == 0 {
            0.0
        } else {
            self.successful_executions as f64 / self.total_executions as f64
        }
    }
}

/// Latest health check result with its timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct HealthRecord {
    pub health: AgentHealth,
    pub checked_at: DateTime<Utc>,
}

/// Point-in-time view of a registered agent, safe to hand out of the
/// registry.
#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub metadata: AgentMetadata,
    pub status: AgentStatus,
    pub active_executions: u32,
    pub usage: UsageStats,
    pub last_health: Option<HealthRecord>,
    pub created_at: DateTime<Utc>,
}

/// A registered agent plus everything the registry tracks about it.
pub struct AgentInstance {
    agent: Arc<dyn Agent>,
    metadata: AgentMetadata,
    state: Mutex<InstanceState>,
    usage: Mutex<UsageStats>,
    last_health: Mutex<Option<HealthRecord>>,
    created_at: DateTime<Utc>,
}

impl AgentInstance {
    pub(crate) fn new(agent: Arc<dyn Agent>) -> Self {
        let metadata = agent.metadata().clone();
        Self {
            agent,
            metadata,
            state: Mutex::new(InstanceState {
                status: AgentStatus::Initializing,
                active_executions: 0,
            }),
            usage: Mutex::new(UsageStats::default()),
            last_health: Mutex::new(None),
            created_at: Utc::now(),
        }
    }

    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.agent
    }

    pub fn metadata(&self) -> &AgentMetadata {
        &self.metadata
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn status(&self) -> AgentStatus {
        self.state.lock().status
    }

    pub fn active_executions(&self) -> u32 {
        self.state.lock().active_executions
    }

    pub fn usage(&self) -> UsageStats {
        self.usage.lock().clone()
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        let state = *self.state.lock();
        AgentSnapshot {
            metadata: self.metadata.clone(),
            status: state.status,
            active_executions: state.active_executions,
            usage: self.usage.lock().clone(),
            last_health: self.last_health.lock().clone(),
            created_at: self.created_at,
        }
    }

    pub(crate) fn set_status(&self, status: AgentStatus) {
        self.state.lock().status = status;
    }

    /// Admission check plus occupancy increment, wrapped in an RAII guard.
    ///
    /// Stopped and errored agents refuse work. The first admitted execution
    /// flips a `Ready` agent to `Busy`; busy is occupancy, not exclusion, so
    /// further executions are admitted as well.
    pub(crate) fn begin_execution(self: &Arc<Self>) -> Result<ExecutionGuard> {
        let mut state = self.state.lock();
        if matches!(state.status, AgentStatus::Stopped | AgentStatus::Error) {
            return Err(ProctorError::AgentUnavailable {
                id: self.metadata.id.clone(),
                status: state.status,
            });
        }
        state.active_executions += 1;
        if state.active_executions == 1 && state.status == AgentStatus::Ready {
            state.status = AgentStatus::Busy;
        }
        Ok(ExecutionGuard {
            instance: Arc::clone(self),
        })
    }

    /// `Ready` → `Stopped`. Rejected while executions are in flight.
    pub(crate) fn pause(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.status != AgentStatus::Ready || state.active_executions > 0 {
            return Err(ProctorError::InvalidState {
                id: self.metadata.id.clone(),
                status: state.status,
                operation: "pause",
            });
        }
        state.status = AgentStatus::Stopped;
        Ok(())
    }

    /// `Stopped` → `Ready`.
    pub(crate) fn resume(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.status != AgentStatus::Stopped {
            return Err(ProctorError::InvalidState {
                id: self.metadata.id.clone(),
                status: state.status,
                operation: "resume",
            });
        }
        state.status = AgentStatus::Ready;
        Ok(())
    }

    /// `Error` → `Initializing`; the registry re-runs initialization after.
    pub(crate) fn begin_restart(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.status != AgentStatus::Error {
            return Err(ProctorError::InvalidState {
                id: self.metadata.id.clone(),
                status: state.status,
                operation: "restart",
            });
        }
        state.status = AgentStatus::Initializing;
        Ok(())
    }

    pub(crate) fn record_execution(&self, success: bool, duration_ms: f64) {
        self.usage.lock().record(success, duration_ms);
    }

    pub(crate) fn record_health(&self, health: AgentHealth) -> HealthRecord {
        let record = HealthRecord {
            health,
            checked_at: Utc::now(),
        };
        *self.last_health.lock() = Some(record.clone());
        record
    }
}

/// RAII occupancy marker. Dropping the guard (success, failure or panic)
/// decrements the counter; the last one out restores `Ready`, and only when
/// the status is still `Busy`, so stopped or errored agents stay put.
pub struct ExecutionGuard {
    instance: Arc<AgentInstance>,
}

impl Drop for ExecutionGuard {
    fn drop(&mut self) {
        let mut state = self.instance.state.lock();
        state.active_executions = state.active_executions.saturating_sub(1);
        if state.active_executions == 0 && state.status == AgentStatus::Busy {
            state.status = AgentStatus::Ready;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentContext, AgentOutput, Result};
    use async_trait::async_trait;
    use serde_json::Value;

    struct NoopAgent {
        metadata: AgentMetadata,
    }

    impl NoopAgent {
        fn instance() -> Arc<AgentInstance> {
            let agent = NoopAgent {
                metadata: AgentMetadata {
                    id: "noop-1".to_string(),
                    name: "Noop".to_string(),
                    description: String::new(),
                    version: "0.0.0".to_string(),
                    capabilities: vec![],
                    dependencies: vec![],
                    tags: vec![],
                },
            };
            Arc::new(AgentInstance::new(Arc::new(agent)))
        }
    }

    #[async_trait]
    impl Agent for NoopAgent {
        fn metadata(&self) -> &AgentMetadata {
            &self.metadata
        }
        async fn initialize(&self) -> Result<()> {
            Ok(())
        }
        async fn execute(&self, _: &Value, _: &AgentContext) -> Result<AgentOutput> {
            Ok(AgentOutput::new(Value::Null))
        }
        async fn health_check(&self) -> Result<AgentHealth> {
            Ok(AgentHealth::healthy())
        }
    }

    #[test]
    fn guard_flips_busy_and_restores_ready() {
        let instance = NoopAgent::instance();
        instance.set_status(AgentStatus::Ready);

        let first = instance.begin_execution().unwrap();
        assert_eq!(instance.status(), AgentStatus::Busy);
        let second = instance.begin_execution().unwrap();
        assert_eq!(instance.active_executions(), 2);

        drop(first);
        // Still one execution in flight.
        assert_eq!(instance.status(), AgentStatus::Busy);
        drop(second);
        assert_eq!(instance.status(), AgentStatus::Ready);
        assert_eq!(instance.active_executions(), 0);
    }

    #[test]
    fn guard_never_resurrects_a_stopped_agent() {
        let instance = NoopAgent::instance();
        instance.set_status(AgentStatus::Ready);

        let guard = instance.begin_execution().unwrap();
        instance.set_status(AgentStatus::Stopped);
        drop(guard);
        assert_eq!(instance.status(), AgentStatus::Stopped);
        assert_eq!(instance.active_executions(), 0);
    }

    #[test]
    fn stopped_and_errored_agents_refuse_work() {
        let instance = NoopAgent::instance();
        instance.set_status(AgentStatus::Stopped);
        assert!(matches!(
            instance.begin_execution().err().unwrap(),
            ProctorError::AgentUnavailable { .. }
        ));

        instance.set_status(AgentStatus::Error);
        assert!(matches!(
            instance.begin_execution().err().unwrap(),
            ProctorError::AgentUnavailable { .. }
        ));
    }

    #[test]
    fn pause_rejects_in_flight_executions() {
        let instance = NoopAgent::instance();
        instance.set_status(AgentStatus::Ready);

        let guard = instance.begin_execution().unwrap();
        let err = instance.pause().unwrap_err();
        assert!(matches!(
            err,
            ProctorError::InvalidState {
                operation: "pause",
                ..
            }
        ));
        assert_eq!(instance.status(), AgentStatus::Busy);

        drop(guard);
        instance.pause().unwrap();
        assert_eq!(instance.status(), AgentStatus::Stopped);
    }

    #[test]
    fn running_average_follows_the_formula() {
        let instance = NoopAgent::instance();
        instance.record_execution(true, 100.0);
        instance.record_execution(true, 200.0);
        instance.record_execution(false, 600.0);

        let usage = instance.usage();
        assert_eq!(usage.total_executions, 3);
        assert_eq!(usage.successful_executions, 2);
        assert_eq!(usage.failed_executions, 1);
        assert!((usage.average_duration_ms - 300.0).abs() < f64::EPSILON);
        assert!((usage.success_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn fresh_stats_report_zero_success_rate() {
        let stats = UsageStats::default();
        assert_eq!(stats.success_rate(), 0.0);
        assert!(stats.last_execution_at.is_none());
    }
}
