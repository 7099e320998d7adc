//! HTTP client shared by the completion backends
//!
//! Handles authentication, JSON request/response handling, retries on HTTP 429
//! with exponential backoff and optional client-side rate limiting.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::{Rng, thread_rng};
use reqwest::{Client as ReqwestClient, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument};

use super::LlmError;

type Result<T> = std::result::Result<T, LlmError>;

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Upper bound for a single backoff sleep
const MAX_BACKOFF_SECS: u64 = 60;

/// Length of the client-side rate limiting window
const RATE_WINDOW: Duration = Duration::from_secs(60);

/// How requests are authenticated
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// `?key=<api key>` query parameter
    QueryKey(String),
    /// `Authorization: Bearer <token>` header
    Bearer(String),
    None,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::QueryKey(_) => f.write_str("QueryKey(..)"),
            Auth::Bearer(_) => f.write_str("Bearer(..)"),
            Auth::None => f.write_str("None"),
        }
    }
}

/// Retry and rate limiting behaviour
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Whether to automatically retry requests when rate limited
    pub retry_on_rate_limit: bool,

    /// Maximum number of retry attempts for rate-limited requests
    pub max_retries: u32,

    /// Retry delay in seconds if no Retry-After header is provided
    pub default_retry_after_secs: u64,

    /// Whether to enable client-side rate limiting
    pub enable_client_side_rate_limiting: bool,

    /// Maximum number of requests allowed per minute
    pub requests_per_minute: u32,

    /// Whether to wait when rate limited instead of returning an error
    pub wait_when_rate_limited: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            retry_on_rate_limit: false,
            max_retries: 3,
            default_retry_after_secs: 2,
            enable_client_side_rate_limiting: false,
            requests_per_minute: 60,
            wait_when_rate_limited: true,
        }
    }
}

/// JSON-over-HTTP client for one API endpoint
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    base_url: String,
    auth: Auth,
    options: HttpOptions,
    /// Request timestamps for rate limiting, shared across clones
    request_timestamps: Arc<Mutex<VecDeque<Instant>>>,
}

#[cfg(test)]
impl HttpClient {
    /// Set the base URL (for testing only)
    pub fn set_base_url(&mut self, url: String) {
        self.base_url = url;
    }
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, auth: Auth, options: HttpOptions) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            options,
            request_timestamps: Arc::new(Mutex::new(VecDeque::new())),
        })
    }

    /// A copy of this client using different credentials
    ///
    /// The copy shares the connection pool and the rate limiting window.
    pub fn with_auth(&self, auth: Auth) -> Self {
        Self {
            auth,
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body to `path` and decode the JSON response
    #[instrument(skip(self, body), level = "debug")]
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut request = self.client.post(url).json(body);

        request = match &self.auth {
            Auth::QueryKey(key) => request.query(&[("key", key)]),
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::None => request,
        };

        debug!("Sending POST request to {}", path);
        self.execute_request(request).await
    }

    /// Wait for (or refuse) a slot in the client-side rate limiting window
    async fn check_rate_limit(&self) -> Result<()> {
        if !self.options.enable_client_side_rate_limiting {
            return Ok(());
        }

        loop {
            let now = Instant::now();
            let mut timestamps = self.request_timestamps.lock().await;

            while let Some(timestamp) = timestamps.front() {
                if now.duration_since(*timestamp) > RATE_WINDOW {
                    timestamps.pop_front();
                } else {
                    break;
                }
            }

            if timestamps.len() >= self.options.requests_per_minute as usize {
                if !self.options.wait_when_rate_limited {
                    return Err(LlmError::RateLimit {
                        retry_after_secs: RATE_WINDOW.as_secs(),
                    });
                }

                let wait = timestamps
                    .front()
                    .and_then(|oldest| RATE_WINDOW.checked_sub(now.duration_since(*oldest)))
                    .unwrap_or(Duration::from_millis(100))
                    .mul_f32(1.1);

                debug!(
                    "Client-side rate limit reached ({} requests in window). Waiting {} ms.",
                    timestamps.len(),
                    wait.as_millis()
                );
                drop(timestamps);
                tokio::time::sleep(wait).await;
                continue;
            }

            timestamps.push_back(now);
            return Ok(());
        }
    }

    /// Backoff for the given attempt: `base * 2^(attempt-1)` with ±20% jitter, capped
    fn backoff_secs(base: u64, attempt: u32) -> u64 {
        let mut delay = base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        if delay > 1 {
            let jitter: f64 = thread_rng().gen_range(0.8..1.2);
            delay = (delay as f64 * jitter) as u64;
        }
        delay.min(MAX_BACKOFF_SECS)
    }

    async fn execute_request<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.check_rate_limit().await?;

        let mut attempts = 0;
        loop {
            let attempt = request
                .try_clone()
                .ok_or_else(|| LlmError::Other("Failed to clone request for retry".to_string()))?;

            let response = attempt.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                attempts += 1;
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(self.options.default_retry_after_secs);

                let body = response.text().await?;
                error!("API error: {} - {}", status, body);

                if self.options.retry_on_rate_limit && attempts <= self.options.max_retries {
                    let delay = Self::backoff_secs(retry_after, attempts);
                    debug!(
                        "Rate limited. Retrying after {} seconds (attempt {}/{})",
                        delay, attempts, self.options.max_retries
                    );
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    continue;
                }

                return Err(LlmError::RateLimit {
                    retry_after_secs: retry_after,
                });
            }

            let body = response.text().await?;
            if status.is_success() {
                return serde_json::from_str(&body).map_err(|e| {
                    error!("Failed to parse response: {}", e);
                    LlmError::UnexpectedResponse(format!("Failed to parse response: {}", e))
                });
            }

            error!("API error: {} - {}", status, body);
            return Err(match status {
                StatusCode::UNAUTHORIZED => {
                    LlmError::Auth("Invalid API key or credentials".to_string())
                }
                StatusCode::NOT_IMPLEMENTED => {
                    LlmError::Unsupported(format!("Operation not supported: {}", body))
                }
                _ => LlmError::Api {
                    status_code: status.as_u16(),
                    message: body,
                },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct TestResponse {
        message: String,
    }

    fn client(server: &mockito::ServerGuard, auth: Auth, options: HttpOptions) -> HttpClient {
        HttpClient::new(server.url(), auth, options).unwrap()
    }

    #[tokio::test]
    async fn test_post_with_query_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/test")
            .match_query(mockito::Matcher::UrlEncoded("key".into(), "secret".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "success"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server, Auth::QueryKey("secret".into()), HttpOptions::default());
        let body = serde_json::json!({"test": "data"});
        let response: TestResponse = client.post("v1beta/test", &body).await.unwrap();
        assert_eq!(response.message, "success");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_with_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat")
            .match_header("authorization", "Bearer token-1")
            .with_status(200)
            .with_body(r#"{"message": "ok"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server, Auth::Bearer("token-1".into()), HttpOptions::default());
        let response: TestResponse = client.post("/v1/chat", &serde_json::json!({})).await.unwrap();
        assert_eq!(response.message, "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/unsupported")
            .with_status(501)
            .with_body("Not Implemented")
            .create_async()
            .await;
        server
            .mock("POST", "/unauthorized")
            .with_status(401)
            .create_async()
            .await;
        server
            .mock("POST", "/broken")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = client(&server, Auth::None, HttpOptions::default());
        let body = serde_json::json!({});

        let result: Result<TestResponse> = client.post("unsupported", &body).await;
        assert!(matches!(result, Err(LlmError::Unsupported(_))));

        let result: Result<TestResponse> = client.post("unauthorized", &body).await;
        assert!(matches!(result, Err(LlmError::Auth(_))));

        let result: Result<TestResponse> = client.post("broken", &body).await;
        assert!(matches!(
            result,
            Err(LlmError::Api { status_code: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_retry_success() {
        let mut server = Server::new_async().await;
        let limited = server
            .mock("POST", "/test")
            .with_status(429)
            .with_header("retry-after", "1")
            .with_body(r#"{"error": "exhausted"}"#)
            .expect(1)
            .create_async()
            .await;
        let success = server
            .mock("POST", "/test")
            .with_status(200)
            .with_body(r#"{"message": "success after retry"}"#)
            .expect(1)
            .create_async()
            .await;

        let options = HttpOptions {
            retry_on_rate_limit: true,
            default_retry_after_secs: 1,
            ..HttpOptions::default()
        };
        let client = client(&server, Auth::None, options);

        let response: TestResponse = client.post("test", &serde_json::json!({})).await.unwrap();
        assert_eq!(response.message, "success after retry");
        limited.assert_async().await;
        success.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_without_retry() {
        let mut server = Server::new_async().await;
        let limited = server
            .mock("POST", "/test")
            .with_status(429)
            .with_header("retry-after", "7")
            .expect(1)
            .create_async()
            .await;

        let client = client(&server, Auth::None, HttpOptions::default());
        let result: Result<TestResponse> = client.post("test", &serde_json::json!({})).await;
        assert!(matches!(
            result,
            Err(LlmError::RateLimit {
                retry_after_secs: 7
            })
        ));
        limited.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_side_rate_limiting() {
        let options = HttpOptions {
            enable_client_side_rate_limiting: true,
            requests_per_minute: 3,
            wait_when_rate_limited: false,
            ..HttpOptions::default()
        };
        let client = HttpClient::new("http://localhost", Auth::None, options).unwrap();

        for _ in 0..3 {
            client.check_rate_limit().await.unwrap();
        }
        assert!(matches!(
            client.check_rate_limit().await,
            Err(LlmError::RateLimit { .. })
        ));

        // clones share the window
        let rotated = client.with_auth(Auth::Bearer("other".into()));
        assert!(rotated.check_rate_limit().await.is_err());

        {
            let mut timestamps = client.request_timestamps.lock().await;
            if let Some(oldest) = timestamps.front_mut() {
                *oldest = Instant::now() - Duration::from_secs(61);
            }
        }
        client.check_rate_limit().await.unwrap();
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(HttpClient::backoff_secs(1, 1), 1);
        assert!(HttpClient::backoff_secs(2, 3) <= 10);
        assert_eq!(HttpClient::backoff_secs(30, 5), MAX_BACKOFF_SECS);
    }
}
