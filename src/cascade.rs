//! # Cascade Module
//!
//! An ordered list of response strategies. Each [`Handler`] either answers a
//! [`Query`] or passes; the first non-empty answer wins.
//!
//! ```rust,no_run
//! use orgbot::bots::BotProfile;
//! use orgbot::cascade::{Cascade, Query, handlers};
//!
//! # async fn run() {
//! let profile = BotProfile::indeed();
//! let cascade = Cascade::new()
//!     .with(handlers::identity(&profile))
//!     .with(handlers::small_talk(&profile.assistant_name))
//!     .with_fallback("Could you rephrase that?");
//!
//! let now = chrono::Local::now().naive_local();
//! let query = Query::new("hello", &[], now);
//! let reply = cascade.respond(&query).await;
//! # }
//! ```

pub mod generative;
pub mod handlers;

pub use generative::{GroundedAnswer, LlmFallback};
pub use handlers::{ContentHandler, FaqHandler, FaqStrategy, RuleHandler};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{debug, info, instrument, warn};

use crate::history::Turn;

/// Handler name reported when the fallback text is used
pub const FALLBACK_HANDLER: &str = "fallback";

/// A user message with the context handlers may need
#[derive(Debug, Clone)]
pub struct Query<'a> {
    /// Message as typed
    pub text: &'a str,
    /// Trimmed, lowercased message
    pub normalized: String,
    /// Turns before this message, oldest first
    pub history: &'a [Turn],
    pub now: NaiveDateTime,
    pub user: Option<&'a str>,
}

impl<'a> Query<'a> {
    pub fn new(text: &'a str, history: &'a [Turn], now: NaiveDateTime) -> Self {
        Self {
            text,
            normalized: text.trim().to_lowercase(),
            history,
            now,
            user: None,
        }
    }

    pub fn with_user(mut self, user: Option<&'a str>) -> Self {
        self.user = user;
        self
    }

    pub fn last_turn(&self) -> Option<&'a Turn> {
        self.history.last()
    }
}

/// One response strategy
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name used in logs and in [`Reply::handler`]
    fn name(&self) -> &str;

    /// `Ok(None)` passes the query on to the next handler
    async fn respond(&self, query: &Query<'_>) -> crate::Result<Option<String>>;
}

/// The answer to a query and the handler that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub handler: String,
}

impl Reply {
    pub fn new(text: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            handler: handler.into(),
        }
    }
}

/// Handlers tried in insertion order
#[derive(Default)]
pub struct Cascade {
    handlers: Vec<Box<dyn Handler>>,
    fallback: Option<String>,
}

impl Cascade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn push(&mut self, handler: Box<dyn Handler>) {
        self.handlers.push(handler);
    }

    /// Text returned when no handler answers
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// First non-empty answer, or the fallback text
    ///
    /// A handler error is logged and treated as no answer.
    #[instrument(skip_all, fields(query = %query.text))]
    pub async fn respond(&self, query: &Query<'_>) -> Option<Reply> {
        for handler in &self.handlers {
            match handler.respond(query).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    info!(handler = handler.name(), "Response found");
                    return Some(Reply::new(text, handler.name()));
                }
                Ok(_) => debug!(handler = handler.name(), "No answer"),
                Err(e) => warn!(handler = handler.name(), "Handler failed: {}", e),
            }
        }

        self.fallback.as_ref().map(|text| {
            info!(handler = FALLBACK_HANDLER, "Response found");
            Reply::new(text.clone(), FALLBACK_HANDLER)
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct Fixed(&'static str, Option<&'static str>);

    #[async_trait]
    impl Handler for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        async fn respond(&self, _query: &Query<'_>) -> crate::Result<Option<String>> {
            Ok(self.1.map(str::to_string))
        }
    }

    struct Broken;

    #[async_trait]
    impl Handler for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn respond(&self, _query: &Query<'_>) -> crate::Result<Option<String>> {
            Err(crate::Error::Other("boom".into()))
        }
    }

    pub(crate) fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_non_empty_answer_wins() {
        let cascade = Cascade::new()
            .with(Fixed("none", None))
            .with(Broken)
            .with(Fixed("blank", Some("   ")))
            .with(Fixed("second", Some("answer")))
            .with(Fixed("third", Some("later")));

        let reply = cascade.respond(&Query::new("q", &[], noon())).await.unwrap();
        assert_eq!(reply, Reply::new("answer", "second"));
        assert_eq!(cascade.handler_names(), vec!["none", "broken", "blank", "second", "third"]);
    }

    #[tokio::test]
    async fn test_fallback() {
        let cascade = Cascade::new().with(Fixed("none", None));
        assert!(cascade.respond(&Query::new("q", &[], noon())).await.is_none());

        let cascade = cascade.with_fallback("Sorry?");
        let reply = cascade.respond(&Query::new("q", &[], noon())).await.unwrap();
        assert_eq!(reply.handler, FALLBACK_HANDLER);
        assert_eq!(reply.text, "Sorry?");
    }

    #[test]
    fn test_query_normalization() {
        let history = vec![Turn::new("hi", "hello")];
        let query = Query::new("  What IS this? ", &history, noon()).with_user(Some("asha"));
        assert_eq!(query.normalized, "what is this?");
        assert_eq!(query.last_turn().unwrap().bot, "hello");
        assert_eq!(query.user, Some("asha"));
    }
}
