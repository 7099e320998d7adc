//! Google Gemini `generateContent` backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::http::{Auth, HttpClient, HttpOptions};
use super::{Completion, CompletionRequest, LlmError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Content sent to or received from the model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }
}

/// A content part; only text parts are produced or read
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl From<&CompletionRequest> for GenerateContentRequest {
    fn from(request: &CompletionRequest) -> Self {
        Self {
            contents: vec![Content::text(Some("user"), request.prompt.clone())],
            system_instruction: request.system.as_ref().map(|s| Content::text(None, s.clone())),
            generation_config: Some(GenerationConfig {
                temperature: Some(request.temperature),
                max_output_tokens: request.max_tokens,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Text of the first text part of the first candidate
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.text.as_deref())
    }
}

/// Gemini completion backend authenticated with an API key
#[derive(Clone)]
pub struct GeminiClient {
    http: HttpClient,
    model: String,
}

impl GeminiClient {
    /// Client with Gemini's free-tier friendly limits (28 requests/minute, retry on 429)
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let options = HttpOptions {
            retry_on_rate_limit: true,
            max_retries: 5,
            default_retry_after_secs: 2,
            enable_client_side_rate_limiting: true,
            requests_per_minute: 28,
            wait_when_rate_limited: true,
        };
        Self::with_options(api_key, model, options)
    }

    pub fn with_options(
        api_key: impl Into<String>,
        model: impl Into<String>,
        options: HttpOptions,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            http: HttpClient::new(DEFAULT_BASE_URL, Auth::QueryKey(api_key.into()), options)?,
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    #[cfg(test)]
    pub fn set_base_url(&mut self, url: String) {
        self.http.set_base_url(url);
    }
}

#[async_trait]
impl Completion for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let path = format!("v1beta/models/{}:generateContent", self.model);
        let response: GenerateContentResponse = self
            .http
            .post(&path, &GenerateContentRequest::from(request))
            .await?;

        response
            .text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| LlmError::UnexpectedResponse("No text in Gemini response".to_string()))
    }
}
