//! # Content Matcher Module
//!
//! Picks the crawled page that best answers a user question and renders a
//! short answer from its most relevant sentence.
//!
//! Two scorers are available:
//!
//! - [`KeywordMatcher`]: raw word overlap, with title words counting double
//! - [`Bm25Matcher`]: Okapi BM25 over tokenized page text
//!
//! Both implement [`ContentMatcher`], and [`MatchStrategy`] selects one at
//! runtime.

mod bm25;
mod keyword;
pub mod tokenize;

pub use bm25::{Bm25Matcher, Bm25Params};
pub use keyword::KeywordMatcher;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::crawler::CrawledPage;
use crate::crawler::storage::SiteIndex;

/// The best page for a query
#[derive(Debug, Clone, PartialEq)]
pub struct ContentMatch {
    pub url: String,
    pub title: String,
    pub score: f64,
    /// Page sentence with the largest word overlap with the query
    pub excerpt: String,
}

impl ContentMatch {
    /// `From our website: <sentence> [Learn more at <url>]`
    pub fn render(&self) -> String {
        format!(
            "From our website: {} [Learn more at {}]",
            self.excerpt, self.url
        )
    }
}

/// Anything that can pick the best page for a query
pub trait ContentMatcher: Send + Sync {
    fn best_match(&self, query: &str) -> Option<ContentMatch>;
}

/// Which scorer a content handler uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    #[default]
    Keyword,
    Bm25,
}

impl MatchStrategy {
    /// Build the matcher for this strategy over a site index
    pub fn matcher(self, index: &SiteIndex) -> Box<dyn ContentMatcher> {
        match self {
            MatchStrategy::Keyword => Box::new(KeywordMatcher::from_index(index)),
            MatchStrategy::Bm25 => Box::new(Bm25Matcher::from_index(index)),
        }
    }
}

/// Best sentence of the page text, falling back to the description
pub(crate) fn excerpt_for(page: &CrawledPage, query_tokens: &HashSet<String>) -> Option<String> {
    tokenize::best_sentence(&page.text, query_tokens)
        .or(page.description.as_deref())
        .map(str::to_string)
}
