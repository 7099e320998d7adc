//! Mistral chat completions backend with API key rotation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use super::http::{Auth, HttpClient, HttpOptions};
use super::{Completion, CompletionRequest, LlmError};

pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai";
pub const DEFAULT_MODEL: &str = "mistral-small";

/// System prompt used when a request carries none
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Token budget used when a request carries none
const DEFAULT_MAX_TOKENS: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// Mistral backend that tries each configured key in order
///
/// Unauthorized, rate-limited and failed calls move on to the next key; the
/// call fails with [`LlmError::Exhausted`] once every key has failed.
#[derive(Clone)]
pub struct MistralClient {
    http: HttpClient,
    keys: Vec<String>,
    model: String,
}

impl MistralClient {
    pub fn new(keys: Vec<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            return Err(LlmError::NotConfigured);
        }

        Ok(Self {
            http: HttpClient::new(DEFAULT_BASE_URL, Auth::None, HttpOptions::default())?,
            keys,
            model: model.into(),
        })
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    #[cfg(test)]
    pub fn set_base_url(&mut self, url: String) {
        self.http.set_base_url(url);
    }

    fn chat_request(&self, request: &CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request
                        .system
                        .clone()
                        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }
}

#[async_trait]
impl Completion for MistralClient {
    fn name(&self) -> &str {
        "mistral"
    }

    #[instrument(skip(self, request), fields(model = %self.model, keys = self.keys.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = self.chat_request(request);

        for (idx, key) in self.keys.iter().enumerate() {
            let client = self.http.with_auth(Auth::Bearer(key.clone()));
            debug!("Trying Mistral API key #{}", idx + 1);

            match client.post::<ChatResponse, _>("v1/chat/completions", &body).await {
                Ok(response) => {
                    if let Some(choice) = response.choices.into_iter().next() {
                        debug!("API call succeeded with key #{}", idx + 1);
                        return Ok(choice.message.content.trim().to_string());
                    }
                    warn!("Key #{} returned no choices", idx + 1);
                }
                Err(LlmError::Auth(_)) => {
                    warn!("Key #{} is unauthorized or expired. Trying next key.", idx + 1)
                }
                Err(LlmError::RateLimit { .. }) => {
                    warn!("Key #{} is rate-limited. Trying next key.", idx + 1)
                }
                Err(e) => warn!("Mistral call with key #{} failed: {}", idx + 1, e),
            }
        }

        error!("All Mistral API keys failed");
        Err(LlmError::Exhausted {
            keys: self.keys.len(),
        })
    }
}
