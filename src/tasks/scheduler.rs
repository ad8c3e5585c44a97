//! Priority scheduler draining the task queue against the agent registry.
//!
//! # Scheduling pass
//!
//! Each pass orders pending tasks by priority (critical first), then
//! submission order. A task runs once every dependency has completed and
//! its target agent reports `ready`; a failed dependency fails the task
//! immediately, without consuming an attempt. Failed attempts are requeued
//! until the attempt budget is spent.
//!
//! # Coordination
//!
//! Callers that need an answer rather than a ticket use
//! [`TaskScheduler::run_coordinated`]: high-priority dependency-free
//! requests execute directly, everything else is queued and resolved
//! through a oneshot watcher when the task reaches a terminal state.

use crate::registry::AgentRegistry;
use crate::tasks::{QueuedTask, TaskId, TaskOptions, TaskPriority, TaskResolution, TaskStatus};
use crate::types::{AgentContext, AgentOutput, AgentStatus, ProctorError, Result};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Configuration for the task scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the queue is drained (default: 5 seconds)
    pub poll_interval: Duration,

    /// Attempts allowed when the caller does not say (default: 3)
    pub default_max_retries: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            default_max_retries: 3,
        }
    }
}

impl SchedulerConfig {
    /// Set the queue drain cadence
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the fallback attempt budget
    pub fn with_default_max_retries(mut self, max_retries: u32) -> Self {
        self.default_max_retries = max_retries;
        self
    }
}

/// Prioritized, dependency-aware task queue over an [`AgentRegistry`].
pub struct TaskScheduler {
    registry: Arc<AgentRegistry>,
    tasks: Mutex<HashMap<TaskId, QueuedTask>>,
    /// Oneshot senders waiting on terminal states, keyed by task.
    /// Lock order: `tasks` before `watchers`, never the reverse.
    watchers: Mutex<HashMap<TaskId, Vec<oneshot::Sender<TaskResolution>>>>,
    next_seq: AtomicU64,
    config: SchedulerConfig,
    shutdown: AtomicBool,
}

impl TaskScheduler {
    /// Create a scheduler bound to a registry
    pub fn new(registry: Arc<AgentRegistry>, config: SchedulerConfig) -> Self {
        Self {
            registry,
            tasks: Mutex::new(HashMap::new()),
            watchers: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            config,
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    // ============= Queueing =============

    /// Queue a task for an agent. Dependencies must already be queued here;
    /// unknown ones are rejected rather than left to dangle.
    pub fn queue_task(
        &self,
        agent_id: impl Into<String>,
        payload: Value,
        options: TaskOptions,
    ) -> Result<TaskId> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(ProctorError::ShutDown);
        }

        let mut tasks = self.tasks.lock();
        for dependency in &options.dependencies {
            if !tasks.contains_key(dependency) {
                return Err(ProctorError::UnknownDependency(*dependency));
            }
        }

        let task = QueuedTask {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            payload,
            priority: options.priority,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            retry_count: 0,
            max_retries: options
                .max_retries
                .unwrap_or(self.config.default_max_retries),
            dependencies: options.dependencies,
            result: None,
            error: None,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        };
        let id = task.id;
        debug!(
            task_id = %id,
            agent_id = %task.agent_id,
            priority = %task.priority,
            "task queued"
        );
        tasks.insert(id, task);
        Ok(id)
    }

    // ============= Scheduling =============

    /// Run one scheduling pass and return how many tasks were dispatched.
    ///
    /// Dispatch is sequential within a pass; concurrency comes from the
    /// registry's admission gate, not from here.
    pub async fn process_pending(&self) -> usize {
        let mut runnable: Vec<(TaskId, String)> = Vec::new();
        let mut dead: Vec<(TaskId, TaskId)> = Vec::new();
        {
            let tasks = self.tasks.lock();
            let mut pending: Vec<&QueuedTask> = tasks
                .values()
                .filter(|task| task.status == TaskStatus::Pending)
                .collect();
            pending.sort_by_key(|task| (Reverse(task.priority), task.created_at, task.seq));

            'next_task: for task in pending {
                for dependency in &task.dependencies {
                    match tasks.get(dependency).map(|d| d.status) {
                        Some(TaskStatus::Completed) => {}
                        Some(TaskStatus::Failed) => {
                            dead.push((task.id, *dependency));
                            continue 'next_task;
                        }
                        // Pending, running, or pruned: wait another pass.
                        _ => continue 'next_task,
                    }
                }
                runnable.push((task.id, task.agent_id.clone()));
            }
        }

        for (task_id, dependency) in dead {
            self.finish_task(
                task_id,
                TaskResolution::Failed(format!("dependency {dependency} failed")),
            );
        }

        let mut dispatched = 0;
        for (task_id, agent_id) in runnable {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
            // An agent that is busy, errored, or missing leaves the task
            // pending for a later pass.
            if self.registry.agent_status(&agent_id) != Some(AgentStatus::Ready) {
                continue;
            }
            let payload = {
                let mut tasks = self.tasks.lock();
                match tasks.get_mut(&task_id) {
                    Some(task) if task.status == TaskStatus::Pending => {
                        task.status = TaskStatus::Running;
                        task.started_at = Some(Utc::now());
                        task.payload.clone()
                    }
                    _ => continue,
                }
            };
            dispatched += 1;

            let outcome = self
                .registry
                .execute_agent(&agent_id, payload, AgentContext::default())
                .await;
            self.settle(task_id, &agent_id, outcome);
        }
        dispatched
    }

    /// Start the background polling loop.
    ///
    /// The task runs until the scheduler is shut down.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let scheduler = Arc::clone(self);
        let poll_interval = scheduler.config.poll_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(poll_interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval_timer.tick().await;

                if scheduler.shutdown.load(Ordering::Relaxed) {
                    break;
                }

                let dispatched = scheduler.process_pending().await;
                if dispatched > 0 {
                    debug!(dispatched, "scheduling pass dispatched tasks");
                }
            }
        })
    }

    // ============= Coordination =============

    /// Execute and wait for the answer.
    ///
    /// High and critical requests without dependencies skip the queue and
    /// run on the spot. Everything else is queued and awaited through a
    /// watcher, so the caller resolves the moment the task settles instead
    /// of polling for it.
    pub async fn run_coordinated(
        &self,
        agent_id: impl Into<String>,
        payload: Value,
        options: TaskOptions,
    ) -> Result<Value> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(ProctorError::ShutDown);
        }
        let agent_id = agent_id.into();

        if options.priority >= TaskPriority::High && options.dependencies.is_empty() {
            debug!(
                agent_id = %agent_id,
                priority = %options.priority,
                "coordinated run taking the direct path"
            );
            let output = self
                .registry
                .execute_agent(&agent_id, payload, AgentContext::default())
                .await?;
            return Ok(output.data);
        }

        let task_id = self.queue_task(agent_id, payload, options)?;
        let watcher = self.subscribe(task_id)?;
        match watcher.await {
            Ok(TaskResolution::Completed(value)) => Ok(value),
            Ok(TaskResolution::Failed(message)) => {
                Err(ProctorError::TaskFailed { id: task_id, message })
            }
            Err(_) => Err(ProctorError::ShutDown),
        }
    }

    /// Watch a task for its terminal state. Tasks already settled resolve
    /// immediately.
    pub fn subscribe(&self, task_id: TaskId) -> Result<oneshot::Receiver<TaskResolution>> {
        let tasks = self.tasks.lock();
        let task = tasks
            .get(&task_id)
            .ok_or(ProctorError::TaskNotFound(task_id))?;

        let (sender, receiver) = oneshot::channel();
        match task.status {
            TaskStatus::Completed => {
                let value = task.result.clone().unwrap_or(Value::Null);
                let _ = sender.send(TaskResolution::Completed(value));
            }
            TaskStatus::Failed => {
                let message = task
                    .error
                    .clone()
                    .unwrap_or_else(|| "task failed".to_string());
                let _ = sender.send(TaskResolution::Failed(message));
            }
            _ => {
                self.watchers.lock().entry(task_id).or_default().push(sender);
            }
        }
        Ok(receiver)
    }

    // ============= Inspection =============

    pub fn get_task(&self, task_id: TaskId) -> Option<QueuedTask> {
        self.tasks.lock().get(&task_id).cloned()
    }

    pub fn task_status(&self, task_id: TaskId) -> Option<TaskStatus> {
        self.tasks.lock().get(&task_id).map(|task| task.status)
    }

    /// Every task the scheduler still remembers, unordered.
    pub fn list(&self) -> Vec<QueuedTask> {
        self.tasks.lock().values().cloned().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.tasks
            .lock()
            .values()
            .filter(|task| task.status == TaskStatus::Pending)
            .count()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Drop settled tasks older than `older_than`. Tasks that other live
    /// tasks depend on are kept so their verdicts stay resolvable.
    pub fn prune_finished(&self, older_than: Duration) -> usize {
        let now = Utc::now();
        let mut tasks = self.tasks.lock();
        let pinned: HashSet<TaskId> = tasks
            .values()
            .filter(|task| !task.is_terminal())
            .flat_map(|task| task.dependencies.iter().copied())
            .collect();

        let before = tasks.len();
        tasks.retain(|id, task| {
            if !task.is_terminal() || pinned.contains(id) {
                return true;
            }
            match task.completed_at {
                Some(done) => {
                    let age = (now - done).to_std().unwrap_or_default();
                    age < older_than
                }
                None => true,
            }
        });
        let pruned = before - tasks.len();
        if pruned > 0 {
            debug!(pruned, "pruned finished tasks");
        }
        pruned
    }

    // ============= Shutdown =============

    /// Stop accepting and dispatching work. Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::Relaxed) {
            return;
        }
        // Dropping the senders wakes every waiting coordinated call.
        self.watchers.lock().clear();
        let pending = self.pending_count();
        info!(pending, "task scheduler shut down");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    // ============= Internal =============

    fn settle(&self, task_id: TaskId, agent_id: &str, outcome: Result<AgentOutput>) {
        match outcome {
            Ok(output) => {
                self.finish_task(task_id, TaskResolution::Completed(output.data));
            }
            Err(e) => {
                let exhausted = {
                    let mut tasks = self.tasks.lock();
                    match tasks.get_mut(&task_id) {
                        Some(task) => {
                            task.retry_count += 1;
                            if task.retry_count >= task.max_retries {
                                true
                            } else {
                                task.status = TaskStatus::Pending;
                                task.started_at = None;
                                debug!(
                                    task_id = %task_id,
                                    agent_id,
                                    attempt = task.retry_count,
                                    max_retries = task.max_retries,
                                    error = %e,
                                    "task attempt failed, requeued"
                                );
                                false
                            }
                        }
                        None => false,
                    }
                };
                if exhausted {
                    self.finish_task(task_id, TaskResolution::Failed(e.to_string()));
                }
            }
        }
    }

    fn finish_task(&self, task_id: TaskId, resolution: TaskResolution) {
        {
            let mut tasks = self.tasks.lock();
            match tasks.get_mut(&task_id) {
                Some(task) => {
                    task.completed_at = Some(Utc::now());
                    match &resolution {
                        TaskResolution::Completed(value) => {
                            task.status = TaskStatus::Completed;
                            task.result = Some(value.clone());
                            debug!(task_id = %task_id, "task completed");
                        }
                        TaskResolution::Failed(message) => {
                            task.status = TaskStatus::Failed;
                            task.error = Some(message.clone());
                            warn!(task_id = %task_id, error = %message, "task failed");
                        }
                    }
                }
                None => return,
            }
        }

        let watchers = self.watchers.lock().remove(&task_id).unwrap_or_default();
        for watcher in watchers {
            let _ = watcher.send(resolution.clone());
        }
    }
}
