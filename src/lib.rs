//! # orgbot - Organisation Chat Assistants for Rust
//!
//! This crate answers user questions on behalf of an organisation by trying a
//! cascade of response strategies until one produces text, then polishing the
//! reply into a conversational turn.
//!
//! ## Features
//!
//! - Breadth-first website crawler with priority-keyword ordering and a JSON content cache
//! - Keyword-overlap and BM25 content matching over crawled pages
//! - FAQ knowledge bases with trigger, keyword-pattern and fuzzy lookup
//! - Rule handlers for greetings, dates, small talk and contact requests
//! - Gemini and Mistral completion clients with retries, rate limiting and key rotation
//! - Conversation drivers, JSON session history and libsql conversation archive
//! - Ready-made assistants: company/foundation/safety bots, a spiritual Q&A bot
//!   and an interview bot
//!
//! ## Example
//!
//! ```rust,no_run
//! use orgbot::bots::{BotProfile, OrgAssistant};
//! use orgbot::history::HistoryStore;
//! use orgbot::knowledge::KnowledgeBase;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let profile = BotProfile::gmtt();
//!     let knowledge = KnowledgeBase::load("gmtt_knowledge.json").with_org_defaults(&profile);
//!     let history = HistoryStore::new(".orgbot/session_history_gmtt.json");
//!
//!     let assistant = OrgAssistant::builder(profile)
//!         .knowledge(knowledge)
//!         .history(history)
//!         .build();
//!
//!     let reply = assistant.respond("What does Give Me Trees Foundation do?", None).await?;
//!     println!("{}", reply.text);
//!     Ok(())
//! }
//! ```

mod error;

pub mod bots;
pub mod cascade;
pub mod config;
pub mod conversation;
pub mod crawler;
pub mod db;
pub mod history;
pub mod knowledge;
pub mod llm;
pub mod matcher;
pub mod rules;

pub use error::{Error, Result};

/// Re-export of common types for public use
pub mod prelude {
    pub use crate::cascade::{Cascade, Handler, Query, Reply};
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::llm::{Completion, CompletionRequest};
}
