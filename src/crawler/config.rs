//! # Crawler Configuration Module
//!
//! Configuration options for the website crawler: page budget, depth,
//! politeness, retry behaviour and the URL/content filters. Uses a builder
//! pattern for flexible configuration.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: The main configuration struct with crawler parameters
//! - `CrawlerConfigBuilder`: Builder pattern implementation for easier configuration

use std::time::Duration;

/// Keywords that move a link to the front of the crawl queue
pub const DEFAULT_PRIORITY_KEYWORDS: &[&str] = &[
    "about",
    "who-we-are",
    "vision-mission",
    "the-founder",
    "nature-education",
    "history",
    "our-story",
    "objectives",
    "values",
    "our-projects",
    "volunteer",
    "impact",
    "our-work",
    "what-we-do",
    "why-gmt",
];

/// File extensions that are never crawled
pub const DEFAULT_DISALLOWED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".ico", ".pdf", ".zip", ".rar", ".mp4", ".mp3",
    ".wav", ".css", ".js", ".json", ".xml",
];

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Maximum number of pages to record
    pub max_pages: u32,

    /// Maximum link depth to follow from the base URL
    pub max_depth: u32,

    /// Minimum delay in milliseconds between requests
    pub rate_limit_ms: u64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Attempts per URL when the transport fails
    pub max_retries: u32,

    /// Delay in milliseconds between retry attempts
    pub retry_delay_ms: u64,

    /// User agent to use for requests
    pub user_agent: String,

    /// Keywords that mark a URL as priority
    pub priority_keywords: Vec<String>,

    /// File extensions that are skipped
    pub disallowed_extensions: Vec<String>,

    /// CSS selectors whose text is not part of the visible text
    pub exclude_selectors: Vec<String>,

    /// Maximum number of characters of visible text kept per page
    pub max_text_chars: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            max_depth: 2,
            rate_limit_ms: 1000,
            request_timeout_secs: 10,
            max_retries: 3,
            retry_delay_ms: 2000,
            user_agent: format!(
                "Mozilla/5.0 (compatible; orgbot/{})",
                env!("CARGO_PKG_VERSION")
            ),
            priority_keywords: DEFAULT_PRIORITY_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            disallowed_extensions: DEFAULT_DISALLOWED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude_selectors: vec![
                "script".to_string(),
                "style".to_string(),
                "noscript".to_string(),
                "template".to_string(),
            ],
            max_text_chars: 10_000,
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set the maximum number of pages to crawl
    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the maximum depth to crawl
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set the delay in milliseconds between requests
    pub fn rate_limit_ms(mut self, rate_limit_ms: u64) -> Self {
        self.config.rate_limit_ms = rate_limit_ms;
        self
    }

    /// Set the per-request timeout in seconds
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Set the number of attempts per URL
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the delay between retry attempts
    pub fn retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.config.retry_delay_ms = retry_delay_ms;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the priority keywords
    pub fn priority_keywords(mut self, keywords: Vec<String>) -> Self {
        self.config.priority_keywords = keywords;
        self
    }

    /// Set the file extensions whose links are never followed
    pub fn disallowed_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.disallowed_extensions = extensions;
        self
    }

    /// Set the CSS selectors for elements to exclude from the visible text
    pub fn exclude_selectors(mut self, exclude_selectors: Vec<String>) -> Self {
        self.config.exclude_selectors = exclude_selectors;
        self
    }

    /// Set the visible text cap per page
    pub fn max_text_chars(mut self, max_text_chars: usize) -> Self {
        self.config.max_text_chars = max_text_chars;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Get the rate limit as a Duration
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    /// Get the request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get the retry delay as a Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Whether a URL contains one of the priority keywords
    pub fn is_priority(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.priority_keywords
            .iter()
            .any(|keyword| lower.contains(&keyword.to_lowercase()))
    }
}
