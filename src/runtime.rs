//! Top-level runtime that wires the registry, scheduler and factory
//! together behind one handle.
//!
//! Hosts construct one [`AgentRuntime`] per process (or per test) and pass
//! it down; nothing in this crate reaches for process-global state. The
//! model client is injected, so tests run against a scripted client and
//! production runs against a real one, with identical wiring.
//!
//! # Example
//!
//! ```rust,ignore
//! use proctor::runtime::AgentRuntime;
//! use proctor::utils::ProctorConfig;
//!
//! let config = ProctorConfig::load("proctor.toml")?;
//! let runtime = AgentRuntime::new(&config, client);
//! runtime.start();
//!
//! let team = runtime.factory().create_project_team("project-7").await;
//! // ... queue tasks, run coordinated calls ...
//! runtime.shutdown();
//! ```

use crate::agents::{AgentFactory, AgentTemplate};
use crate::llm::CompletionClient;
use crate::registry::AgentRegistry;
use crate::tasks::TaskScheduler;
use crate::types::{ProctorError, Result};
use crate::utils::config::ProctorConfig;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Owning handle over the agent subsystem.
pub struct AgentRuntime {
    registry: Arc<AgentRegistry>,
    scheduler: Arc<TaskScheduler>,
    factory: Arc<AgentFactory>,
    background: Mutex<Vec<tokio::task::JoinHandle<()>>>,
    started: AtomicBool,
}

impl AgentRuntime {
    /// Build a runtime from configuration and a model client.
    ///
    /// The built-in agent templates are registered; background loops stay
    /// parked until [`start`](Self::start).
    pub fn new(config: &ProctorConfig, client: Arc<dyn CompletionClient>) -> Self {
        let registry = Arc::new(AgentRegistry::new(config.registry_config()));
        let scheduler = Arc::new(TaskScheduler::new(
            Arc::clone(&registry),
            config.scheduler_config(),
        ));
        let factory = Arc::new(AgentFactory::with_builtin_templates(
            Arc::clone(&registry),
            client,
            config.agent_defaults(),
        ));
        Self {
            registry,
            scheduler,
            factory,
            background: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Runtime with stock configuration
    pub fn with_defaults(client: Arc<dyn CompletionClient>) -> Self {
        Self::new(&ProctorConfig::default(), client)
    }

    /// Start the health sweep and the scheduling loop. Idempotent.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::Relaxed) {
            return;
        }
        let mut background = self.background.lock();
        background.push(self.registry.start_health_loop());
        background.push(self.scheduler.start());
        info!("agent runtime started");
    }

    /// Whether [`start`](Self::start) has run.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Relaxed)
    }

    /// The agent registry.
    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// The task scheduler.
    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    /// The agent factory.
    pub fn factory(&self) -> &Arc<AgentFactory> {
        &self.factory
    }

    /// Stop accepting work everywhere and cancel the background loops.
    /// Idempotent; executions already in flight finish on their own.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        self.registry.shutdown();
        for handle in self.background.lock().drain(..) {
            handle.abort();
        }
        info!("agent runtime shut down");
    }
}

/// Builder for runtimes that need more than the stock wiring: extra agent
/// templates, or a template set without the built-ins.
pub struct AgentRuntimeBuilder {
    config: ProctorConfig,
    client: Option<Arc<dyn CompletionClient>>,
    templates: Vec<AgentTemplate>,
    builtin_templates: bool,
}

impl AgentRuntimeBuilder {
    /// Builder with default configuration and the built-in templates.
    pub fn new() -> Self {
        Self {
            config: ProctorConfig::default(),
            client: None,
            templates: Vec::new(),
            builtin_templates: true,
        }
    }

    /// Use this configuration instead of the defaults.
    pub fn with_config(mut self, config: ProctorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the model client. Required.
    pub fn with_client(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Register an additional agent template on top of the built-ins.
    pub fn with_template(mut self, template: AgentTemplate) -> Self {
        self.templates.push(template);
        self
    }

    /// Leave the built-in templates out; only explicitly added templates
    /// remain available.
    pub fn without_builtin_templates(mut self) -> Self {
        self.builtin_templates = false;
        self
    }

    /// Assemble the runtime.
    pub fn build(self) -> Result<AgentRuntime> {
        let client = self.client.ok_or_else(|| {
            ProctorError::Configuration(
                "a completion client is required to build the runtime".to_string(),
            )
        })?;

        let runtime = if self.builtin_templates {
            AgentRuntime::new(&self.config, client)
        } else {
            let registry = Arc::new(AgentRegistry::new(self.config.registry_config()));
            let scheduler = Arc::new(TaskScheduler::new(
                Arc::clone(&registry),
                self.config.scheduler_config(),
            ));
            let factory = Arc::new(AgentFactory::new(
                Arc::clone(&registry),
                client,
                self.config.agent_defaults(),
            ));
            AgentRuntime {
                registry,
                scheduler,
                factory,
                background: Mutex::new(Vec::new()),
                started: AtomicBool::new(false),
            }
        };
        for template in self.templates {
            runtime.factory.register_template(template);
        }
        Ok(runtime)
    }
}

impl Default for AgentRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
