//! # Bots Module
//!
//! Ready-made assistants built on the cascade.
//!
//! - [`OrgAssistant`]: company, foundation and safety-training assistants
//! - [`SpiritualBot`]: fixed Q&A for the Sant Nirankari Mission
//! - [`InterviewSession`]: timed interview with LLM questions and scoring

pub mod interview;
pub mod nirankari;
pub mod org;
mod profile;

pub use interview::{InterviewLevel, InterviewSession};
pub use nirankari::SpiritualBot;
pub use org::{OrgAssistant, OrgAssistantBuilder};
pub use profile::{BotKind, BotProfile, DEFAULT_CONTACT_EMAIL};
