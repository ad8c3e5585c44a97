//! Task queue: prioritized, dependency-aware execution requests and the
//! scheduler that drains them.

pub mod scheduler;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub use scheduler::{SchedulerConfig, TaskScheduler};

/// Identifier assigned when a task is queued.
pub type TaskId = Uuid;

// ============= Priority & Status =============

/// Scheduling priority. Higher priorities drain first; within one priority
/// tasks run in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a task sits in its life cycle. `Completed` and `Failed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

// ============= Task Records =============

/// A queued execution request and everything learned about it since.
#[derive(Debug, Clone, Serialize)]
pub struct QueuedTask {
    pub id: TaskId,
    /// Registry id of the agent this task targets.
    pub agent_id: String,
    pub payload: Value,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Attempts made so far.
    pub retry_count: u32,
    /// Total attempts allowed before the task fails for good.
    pub max_retries: u32,
    /// Tasks that must complete before this one may run.
    pub dependencies: Vec<TaskId>,
    pub result: Option<Value>,
    pub error: Option<String>,
    /// Submission tiebreaker for tasks created in the same instant.
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl QueuedTask {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Knobs accepted at queue time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOptions {
    /// Scheduling priority (default: medium)
    pub priority: TaskPriority,

    /// Total attempts allowed; falls back to the scheduler default when unset
    pub max_retries: Option<u32>,

    /// Tasks that must complete first
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            priority: TaskPriority::Medium,
            max_retries: None,
            dependencies: Vec::new(),
        }
    }
}

impl TaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_dependency(mut self, dependency: TaskId) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<TaskId>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// Terminal outcome delivered to callers awaiting a task.
#[derive(Debug, Clone)]
pub enum TaskResolution {
    Completed(Value),
    Failed(String),
}
