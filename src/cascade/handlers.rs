//! Handlers over rules, the FAQ knowledge base and crawled content

use std::sync::Arc;

use async_trait::async_trait;

use super::{Handler, Query};
use crate::bots::BotProfile;
use crate::knowledge::{FaqEntry, KnowledgeBase};
use crate::matcher::ContentMatcher;
use crate::rules;

type RuleFn = dyn Fn(&Query<'_>) -> Option<String> + Send + Sync;

/// A synchronous rule wrapped as a handler
pub struct RuleHandler {
    name: &'static str,
    rule: Box<RuleFn>,
}

impl RuleHandler {
    pub fn new<F>(name: &'static str, rule: F) -> Self
    where
        F: Fn(&Query<'_>) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            name,
            rule: Box::new(rule),
        }
    }
}

#[async_trait]
impl Handler for RuleHandler {
    fn name(&self) -> &str {
        self.name
    }

    async fn respond(&self, query: &Query<'_>) -> crate::Result<Option<String>> {
        Ok((self.rule)(query))
    }
}

/// Name and identity questions
pub fn identity(profile: &BotProfile) -> RuleHandler {
    let profile = profile.clone();
    RuleHandler::new("identity", move |q| rules::identity(q.text, &profile))
}

/// "What can I ask you?"
pub fn meta(profile: &BotProfile) -> RuleHandler {
    let profile = profile.clone();
    RuleHandler::new("meta", move |q| rules::meta_question(q.text, &profile))
}

pub fn time_greeting() -> RuleHandler {
    RuleHandler::new("time_greeting", |q| rules::time_greeting(q.text, q.now))
}

pub fn date() -> RuleHandler {
    RuleHandler::new("date", |q| rules::date_query(q.text, q.now))
}

pub fn small_talk(assistant_name: &str) -> RuleHandler {
    let name = assistant_name.to_string();
    RuleHandler::new("small_talk", move |q| rules::small_talk(q.text, &name))
}

/// Contact requests and users volunteering their own details
pub fn contact(contact_email: &str) -> RuleHandler {
    let email = contact_email.to_string();
    RuleHandler::new("contact", move |q| {
        if rules::is_contact_request(q.text) {
            Some(rules::contact_request_reply(&email))
        } else if rules::is_info_request(q.text) {
            Some(rules::info_statement_reply(&email))
        } else {
            None
        }
    })
}

/// How a [`FaqHandler`] looks up entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaqStrategy {
    /// A trigger phrase is contained in the query
    Trigger,
    /// A keyword pattern matches the query
    Keyword,
    /// The query is close to an entry's question
    Fuzzy,
}

/// Answers from the FAQ knowledge base with one lookup strategy
pub struct FaqHandler {
    knowledge: Arc<KnowledgeBase>,
    strategy: FaqStrategy,
}

impl FaqHandler {
    pub fn new(knowledge: Arc<KnowledgeBase>, strategy: FaqStrategy) -> Self {
        Self { knowledge, strategy }
    }

    fn lookup(&self, query: &str) -> Option<&FaqEntry> {
        match self.strategy {
            FaqStrategy::Trigger => self.knowledge.match_trigger(query),
            FaqStrategy::Keyword => self.knowledge.match_keyword(query),
            FaqStrategy::Fuzzy => self.knowledge.match_fuzzy(query).map(|(entry, _)| entry),
        }
    }
}

#[async_trait]
impl Handler for FaqHandler {
    fn name(&self) -> &str {
        match self.strategy {
            FaqStrategy::Trigger => "faq_trigger",
            FaqStrategy::Keyword => "faq_keyword",
            FaqStrategy::Fuzzy => "faq_fuzzy",
        }
    }

    async fn respond(&self, query: &Query<'_>) -> crate::Result<Option<String>> {
        Ok(self
            .lookup(&query.normalized)
            .and_then(FaqEntry::pick_response)
            .map(str::to_string))
    }
}

/// Best crawled page for the query, rendered with its link
pub struct ContentHandler {
    matcher: Box<dyn ContentMatcher>,
}

impl ContentHandler {
    pub fn new(matcher: Box<dyn ContentMatcher>) -> Self {
        Self { matcher }
    }
}

#[async_trait]
impl Handler for ContentHandler {
    fn name(&self) -> &str {
        "content"
    }

    async fn respond(&self, query: &Query<'_>) -> crate::Result<Option<String>> {
        Ok(self.matcher.best_match(query.text).map(|m| m.render()))
    }
}
