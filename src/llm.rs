//! # LLM Module
//!
//! Text completion backends used for open-ended answers, yes/no
//! classification and reply polishing.
//!
//! ## Key Components
//!
//! - [`Completion`]: the async trait every backend implements
//! - [`GeminiClient`]: Google Gemini `generateContent`
//! - [`MistralClient`]: Mistral chat completions with key rotation
//! - [`FallbackChain`]: tries several backends in order
//! - [`http::HttpClient`]: shared JSON client with 429 retries and rate limiting

mod error;
pub mod gemini;
pub mod http;
pub mod mistral;
#[cfg(test)]
pub mod mock;

pub use error::LlmError;
pub use gemini::GeminiClient;
pub use mistral::MistralClient;
#[cfg(test)]
pub use mock::MockCompletion;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::config::Settings;

/// A single prompt for a completion backend
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    /// Backend default when `None`
    pub max_tokens: Option<u32>,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: None,
            temperature: 0.7,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A text completion backend
#[async_trait]
pub trait Completion: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Shared handle to a completion backend
pub type SharedCompletion = Arc<dyn Completion>;

/// Tries each backend in order and returns the first successful reply
#[derive(Clone, Default)]
pub struct FallbackChain {
    backends: Vec<SharedCompletion>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, backend: SharedCompletion) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Backends built from the configured API keys, Gemini first
    pub fn from_settings(settings: &Settings) -> Result<Self, LlmError> {
        let mut chain = Self::new();
        if let Some(key) = &settings.gemini_api_key {
            chain = chain.with(Arc::new(GeminiClient::new(key.clone(), settings.gemini_model.clone())?));
        }
        if !settings.mistral_api_keys.is_empty() {
            chain = chain.with(Arc::new(MistralClient::new(
                settings.mistral_api_keys.clone(),
                settings.mistral_model.clone(),
            )?));
        }
        Ok(chain)
    }
}

#[async_trait]
impl Completion for FallbackChain {
    fn name(&self) -> &str {
        "fallback-chain"
    }

    #[instrument(skip(self, request), fields(backends = self.backends.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut last_error = LlmError::NotConfigured;
        for backend in &self.backends {
            match backend.complete(request).await {
                Ok(reply) => {
                    debug!(backend = backend.name(), "Completion succeeded");
                    return Ok(reply);
                }
                Err(e) => {
                    warn!(backend = backend.name(), "Completion failed: {}", e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

/// Ask a yes/no question; true only when the trimmed reply is `YES`
pub async fn ask_yes_no(llm: &dyn Completion, prompt: &str) -> Result<bool, LlmError> {
    let reply = llm.complete(&CompletionRequest::new(prompt)).await?;
    Ok(reply.trim().to_uppercase() == "YES")
}
