//! Okapi BM25 ranking over crawled pages

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::tokenize::{content_tokens, token_set};
use super::{ContentMatch, ContentMatcher, excerpt_for};
use crate::crawler::CrawledPage;
use crate::crawler::storage::SiteIndex;

/// Ranking parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

struct Document {
    page: CrawledPage,
    term_freq: HashMap<String, usize>,
    len: usize,
}

/// BM25 index built over the title and text of each page
pub struct Bm25Matcher {
    docs: Vec<Document>,
    doc_freq: HashMap<String, usize>,
    avg_len: f64,
    params: Bm25Params,
    min_score: f64,
}

impl Bm25Matcher {
    pub const DEFAULT_MIN_SCORE: f64 = 1.0;

    pub fn new(pages: impl IntoIterator<Item = CrawledPage>) -> Self {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let docs: Vec<Document> = pages
            .into_iter()
            .map(|page| {
                let tokens = content_tokens(&format!("{} {}", page.title, page.text));
                let mut term_freq = HashMap::new();
                for token in &tokens {
                    *term_freq.entry(token.clone()).or_insert(0) += 1;
                }
                for term in term_freq.keys() {
                    *doc_freq.entry(term.clone()).or_insert(0) += 1;
                }
                Document {
                    page,
                    len: tokens.len(),
                    term_freq,
                }
            })
            .collect();

        let avg_len = if docs.is_empty() {
            0.0
        } else {
            docs.iter().map(|d| d.len).sum::<usize>() as f64 / docs.len() as f64
        };

        Self {
            docs,
            doc_freq,
            avg_len,
            params: Bm25Params::default(),
            min_score: Self::DEFAULT_MIN_SCORE,
        }
    }

    pub fn from_index(index: &SiteIndex) -> Self {
        Self::new(index.iter().cloned())
    }

    pub fn with_params(mut self, params: Bm25Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn score(&self, doc: &Document, terms: &HashSet<String>) -> f64 {
        let Bm25Params { k1, b } = self.params;
        let norm = if self.avg_len > 0.0 {
            doc.len as f64 / self.avg_len
        } else {
            0.0
        };

        terms
            .iter()
            .filter_map(|term| {
                let tf = *doc.term_freq.get(term)? as f64;
                Some(self.idf(term) * tf * (k1 + 1.0) / (tf + k1 * (1.0 - b + b * norm)))
            })
            .sum()
    }

    /// Up to `limit` `(url, score)` pairs with a positive score, best first
    pub fn rank(&self, query: &str, limit: usize) -> Vec<(String, f64)> {
        let terms: HashSet<String> = content_tokens(query).into_iter().collect();
        let mut ranked: Vec<(usize, f64)> = self
            .docs
            .iter()
            .enumerate()
            .map(|(i, doc)| (i, self.score(doc, &terms)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(limit)
            .map(|(i, score)| (self.docs[i].page.url.clone(), score))
            .collect()
    }
}

impl ContentMatcher for Bm25Matcher {
    fn best_match(&self, query: &str) -> Option<ContentMatch> {
        let terms: HashSet<String> = content_tokens(query).into_iter().collect();
        let (doc, score) = self
            .docs
            .iter()
            .map(|doc| (doc, self.score(doc, &terms)))
            .fold(None, |best: Option<(&Document, f64)>, (doc, score)| match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((doc, score)),
            })?;

        if score <= self.min_score {
            debug!("Best BM25 score {:.3} below threshold", score);
            return None;
        }

        let excerpt = excerpt_for(&doc.page, &token_set(query))?;
        Some(ContentMatch {
            url: doc.page.url.clone(),
            title: doc.page.title.clone(),
            score,
            excerpt,
        })
    }
}
