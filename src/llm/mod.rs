//! Model invocation boundary.
//!
//! Proctor never talks to a model provider directly. The host application
//! supplies a [`CompletionClient`] implementation and every agent goes
//! through it; transport, authentication, quota handling and provider
//! selection all live behind the trait.

use crate::types::Result;
use async_trait::async_trait;

/// Unified interface to whatever model backend the host wires in.
///
/// Implementations report upstream conditions (rate limits, outages,
/// deadline overruns) as classified
/// [`ExecutionFailure`](crate::types::ExecutionFailure)s so callers can
/// tell transient failures from fatal ones.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run a single completion request to its end.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Model identifier, used in health reports and logs.
    fn model_name(&self) -> &str;
}

/// A single-turn completion request.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Completion content plus whatever usage accounting the provider reports.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub tokens_used: Option<u32>,
}

impl Completion {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tokens_used: None,
        }
    }

    pub fn with_tokens(mut self, tokens: Option<u32>) -> Self {
        self.tokens_used = tokens;
        self
    }
}
