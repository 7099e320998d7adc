//! # Knowledge Module
//!
//! FAQ knowledge bases loaded from JSON and the lookup strategies the
//! assistants try before falling back to generated answers:
//!
//! 1. trigger phrases contained in the query
//! 2. whole-word keyword patterns
//! 3. fuzzy similarity between the query and the stored questions

mod error;
mod loader;

pub use error::KnowledgeError;

use std::path::Path;

use rand::seq::SliceRandom;
use regex::{Regex, RegexBuilder};
use tracing::{debug, error, instrument};

use crate::bots::BotProfile;
use loader::KnowledgeFile;

/// Minimum fuzzy score (0..100) for a question to match
pub const FUZZY_THRESHOLD: f64 = 70.0;

/// One question with its canned responses
#[derive(Debug, Clone)]
pub struct FaqEntry {
    pub question: String,
    pub responses: Vec<String>,
    /// Lowercased phrases that match when contained in the query
    pub triggers: Vec<String>,
    pub keywords: Vec<String>,
    pub follow_up: Option<String>,
    patterns: Vec<Regex>,
}

impl FaqEntry {
    pub fn new(question: impl Into<String>, responses: Vec<String>) -> Self {
        Self {
            question: question.into(),
            responses,
            triggers: Vec::new(),
            keywords: Vec::new(),
            follow_up: None,
            patterns: Vec::new(),
        }
    }

    pub fn with_triggers<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.triggers = triggers
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    /// Keywords match case-insensitively on word boundaries
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Result<Self, KnowledgeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<String> = keywords.into_iter().map(Into::into).collect();
        self.patterns = keywords
            .iter()
            .map(|keyword| {
                RegexBuilder::new(&format!(r"\b{}\b", regex::escape(keyword)))
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| KnowledgeError::Pattern {
                        keyword: keyword.clone(),
                        source,
                    })
            })
            .collect::<Result<_, _>>()?;
        self.keywords = keywords;
        Ok(self)
    }

    pub fn with_follow_up(mut self, follow_up: Option<String>) -> Self {
        self.follow_up = follow_up.filter(|f| !f.trim().is_empty());
        self
    }

    /// A uniformly random response, or `None` when the entry has none
    pub fn pick_response(&self) -> Option<&str> {
        self.responses
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }

    fn matches_trigger(&self, query: &str) -> bool {
        self.triggers.iter().any(|t| query.contains(t.as_str()))
    }

    fn matches_keyword(&self, query: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(query))
    }
}

/// Character similarity of two strings in `0.0..=1.0`
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    similar::TextDiff::from_chars(a, b).ratio() as f64
}

/// An ordered collection of [`FaqEntry`] values
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    entries: Vec<FaqEntry>,
}

impl KnowledgeBase {
    pub fn new(entries: Vec<FaqEntry>) -> Self {
        Self { entries }
    }

    /// Load a knowledge base file; an unreadable file yields an empty base
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(kb) => {
                debug!("Loaded {} entries from {}", kb.len(), path.display());
                kb
            }
            Err(e) => {
                error!("Error loading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, KnowledgeError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Parse any of the supported JSON layouts
    pub fn from_json_str(json: &str) -> Result<Self, KnowledgeError> {
        let entries = match serde_json::from_str::<KnowledgeFile>(json)? {
            KnowledgeFile::Faqs { faqs } => faqs
                .into_iter()
                .map(|faq| {
                    FaqEntry::new(faq.question, faq.responses)
                        .with_triggers(faq.triggers)
                        .with_keywords(faq.keywords)
                })
                .collect::<Result<Vec<_>, _>>()?,
            KnowledgeFile::Intents { faqs } => faqs
                .intents
                .into_iter()
                .map(|intent| {
                    FaqEntry::new(intent.tag, intent.responses)
                        .with_triggers(intent.patterns)
                        .with_follow_up(intent.follow_up)
                })
                .collect(),
            KnowledgeFile::Flat(map) => map
                .into_iter()
                .map(|(question, answer)| {
                    let trigger = question.trim_end_matches('?').to_string();
                    FaqEntry::new(question, vec![answer]).with_triggers([trigger])
                })
                .collect(),
        };
        Ok(Self { entries })
    }

    /// Append the "What is <org>?" and "What does <org> do?" entries
    pub fn with_org_defaults(mut self, profile: &BotProfile) -> Self {
        let org = &profile.org_name;
        let org_lower = org.to_lowercase();
        let kind = &profile.org_type;
        let listed = profile.services.join(", ");
        let sentence = profile.services_sentence();

        self.entries.push(
            FaqEntry::new(
                format!("What is {}?", org),
                vec![
                    format!("I'm part of {}, a {} focused on {}.", org, kind, sentence),
                    format!(
                        "{} is the {} I represent. We specialize in {}.",
                        org, kind, listed
                    ),
                ],
            )
            .with_triggers([
                format!("what is {}", org_lower),
                format!("about {}", org_lower),
                format!("tell me about {}", org_lower),
            ]),
        );
        self.entries.push(
            FaqEntry::new(
                format!("What does {} do?", org),
                vec![
                    format!(
                        "At {}, we work on {}. I'm proud to be part of this team!",
                        org, sentence
                    ),
                    format!(
                        "Our {} focuses on {}. As a representative, I can tell you more about our work.",
                        kind, listed
                    ),
                ],
            )
            .with_triggers([
                format!("what does {} do", org_lower),
                format!("work of {}", org_lower),
                format!("services of {}", org_lower),
                format!("what your {} does", kind.to_lowercase()),
            ]),
        );
        self
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry with a trigger phrase contained in the query
    pub fn match_trigger(&self, query: &str) -> Option<&FaqEntry> {
        let query = query.to_lowercase();
        self.entries.iter().find(|e| e.matches_trigger(&query))
    }

    /// First entry with a keyword pattern matching the query
    pub fn match_keyword(&self, query: &str) -> Option<&FaqEntry> {
        let query = query.to_lowercase();
        self.entries.iter().find(|e| e.matches_keyword(&query))
    }

    /// Entry whose question is most similar to the query, scored 0..100,
    /// when the score exceeds [`FUZZY_THRESHOLD`]
    pub fn match_fuzzy(&self, query: &str) -> Option<(&FaqEntry, f64)> {
        let query = query.to_lowercase();
        let mut best: Option<(&FaqEntry, f64)> = None;
        for entry in &self.entries {
            let score = (similarity(&query, &entry.question.to_lowercase()) * 100.0).round();
            if score > FUZZY_THRESHOLD && best.is_none_or(|(_, s)| score > s) {
                best = Some((entry, score));
            }
        }
        best
    }

    /// Highest similarity between the query and any question or trigger
    pub fn best_similarity(&self, query: &str) -> f64 {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .flat_map(|e| std::iter::once(e.question.to_lowercase()).chain(e.triggers.clone()))
            .map(|candidate| similarity(&query, &candidate))
            .fold(0.0, f64::max)
    }

    /// Try triggers, keywords and fuzzy matching in turn
    #[instrument(skip(self))]
    pub fn search(&self, query: &str) -> Option<String> {
        self.match_trigger(query)
            .or_else(|| self.match_keyword(query))
            .or_else(|| self.match_fuzzy(query).map(|(entry, _)| entry))
            .and_then(FaqEntry::pick_response)
            .map(str::to_string)
    }

    /// `Q: ... / A: ...` lines used as grounding context for generated answers
    pub fn context(&self) -> String {
        self.entries
            .iter()
            .filter_map(|e| {
                e.responses
                    .first()
                    .map(|answer| format!("Q: {}\nA: {}\n", e.question, answer))
            })
            .collect()
    }
}
