//! TOML-based configuration for Proctor
//!
//! Declarative settings for the registry, scheduler and agent defaults via
//! a TOML file (`proctor.toml`). Every field has a default, so an empty
//! file yields a runnable configuration.

use crate::registry::RegistryConfig;
use crate::tasks::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from proctor.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProctorConfig {
    #[serde(default)]
    pub registry: RegistrySection,

    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// Defaults applied to agent configs that leave fields unset
    #[serde(default)]
    pub agents: AgentDefaults,
}

// ============= Registry Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySection {
    #[serde(default = "default_max_concurrent_executions")]
    pub max_concurrent_executions: usize,

    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_secs: u64,

    #[serde(default = "default_health_check_timeout")]
    pub health_check_timeout_secs: u64,

    /// Per-execution deadline; zero disables it
    #[serde(default = "default_execution_timeout")]
    pub execution_timeout_secs: u64,
}

fn default_max_concurrent_executions() -> usize {
    10
}

fn default_health_check_interval() -> u64 {
    60
}

fn default_health_check_timeout() -> u64 {
    10
}

fn default_execution_timeout() -> u64 {
    120
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            max_concurrent_executions: default_max_concurrent_executions(),
            health_check_interval_secs: default_health_check_interval(),
            health_check_timeout_secs: default_health_check_timeout(),
            execution_timeout_secs: default_execution_timeout(),
        }
    }
}

// ============= Scheduler Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    3
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            default_max_retries: default_max_retries(),
        }
    }
}

// ============= Agent Defaults =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaults {
    #[serde(default = "default_agent_version")]
    pub version: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_agent_max_tokens")]
    pub max_tokens: u32,
}

fn default_agent_version() -> String {
    "1.0.0".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_agent_max_tokens() -> u32 {
    2048
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            version: default_agent_version(),
            temperature: default_temperature(),
            max_tokens: default_agent_max_tokens(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ProctorConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: ProctorConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for values that would wedge the runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.max_concurrent_executions == 0 {
            return Err(ConfigError::ValidationError(
                "registry.max_concurrent_executions must be at least 1".to_string(),
            ));
        }
        if self.registry.health_check_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "registry.health_check_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.registry.health_check_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "registry.health_check_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.scheduler.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.scheduler.default_max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.default_max_retries must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.agents.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "agents.temperature must be between 0.0 and 2.0, got {}",
                self.agents.temperature
            )));
        }
        if self.agents.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "agents.max_tokens must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Runtime settings for the agent registry
    pub fn registry_config(&self) -> RegistryConfig {
        let execution_timeout = match self.registry.execution_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        RegistryConfig {
            max_concurrent_executions: self.registry.max_concurrent_executions,
            health_check_interval: Duration::from_secs(self.registry.health_check_interval_secs),
            health_check_timeout: Duration::from_secs(self.registry.health_check_timeout_secs),
            execution_timeout,
        }
    }

    /// Runtime settings for the task scheduler
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: Duration::from_secs(self.scheduler.poll_interval_secs),
            default_max_retries: self.scheduler.default_max_retries,
        }
    }

    pub fn agent_defaults(&self) -> AgentDefaults {
        self.agents.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config() -> String {
        r#"
[registry]
max_concurrent_executions = 4
health_check_interval_secs = 30
health_check_timeout_secs = 5
execution_timeout_secs = 60

[scheduler]
poll_interval_secs = 2
default_max_retries = 5

[agents]
version = "2.1.0"
temperature = 0.3
max_tokens = 4096
"#
        .to_string()
    }

    #[test]
    fn test_parse_config() {
        let content = create_test_config();
        let config: ProctorConfig = toml::from_str(&content).expect("Failed to parse config");

        assert_eq!(config.registry.max_concurrent_executions, 4);
        assert_eq!(config.registry.execution_timeout_secs, 60);
        assert_eq!(config.scheduler.poll_interval_secs, 2);
        assert_eq!(config.agents.version, "2.1.0");
    }

    #[test]
    fn test_defaults() {
        let config: ProctorConfig = toml::from_str("").unwrap();

        assert_eq!(config.registry.max_concurrent_executions, 10);
        assert_eq!(config.registry.health_check_interval_secs, 60);
        assert_eq!(config.registry.health_check_timeout_secs, 10);
        assert_eq!(config.registry.execution_timeout_secs, 120);

        assert_eq!(config.scheduler.poll_interval_secs, 5);
        assert_eq!(config.scheduler.default_max_retries, 3);

        assert_eq!(config.agents.version, "1.0.0");
        assert_eq!(config.agents.temperature, 0.7);
        assert_eq!(config.agents.max_tokens, 2048);
    }

    #[test]
    fn test_validation_rejects_zero_concurrency() {
        let content = r#"
[registry]
max_concurrent_executions = 0
"#;
        let config: ProctorConfig = toml::from_str(content).unwrap();
        let result = config.validate();

        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validation_rejects_zero_retries() {
        let content = r#"
[scheduler]
default_max_retries = 0
"#;
        let config: ProctorConfig = toml::from_str(content).unwrap();
        let result = config.validate();

        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validation_rejects_out_of_range_temperature() {
        let content = r#"
[agents]
temperature = 3.5
"#;
        let config: ProctorConfig = toml::from_str(content).unwrap();
        let result = config.validate();

        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_zero_execution_timeout_disables_deadline() {
        let content = r#"
[registry]
execution_timeout_secs = 0
"#;
        let config: ProctorConfig = toml::from_str(content).unwrap();
        let registry = config.registry_config();

        assert_eq!(registry.execution_timeout, None);
        assert_eq!(registry.max_concurrent_executions, 10);
    }

    #[test]
    fn test_scheduler_config_conversion() {
        let content = create_test_config();
        let config: ProctorConfig = toml::from_str(&content).unwrap();
        let scheduler = config.scheduler_config();

        assert_eq!(scheduler.poll_interval, Duration::from_secs(2));
        assert_eq!(scheduler.default_max_retries, 5);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("proctor.toml");
        fs::write(&path, create_test_config()).expect("Failed to write config");

        let config = ProctorConfig::load(&path).expect("Failed to load config");
        assert_eq!(config.registry.max_concurrent_executions, 4);
    }

    #[test]
    fn test_load_missing_file() {
        let result = ProctorConfig::load("/nonexistent/proctor.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
