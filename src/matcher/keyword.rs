//! Raw keyword-overlap scoring

use std::collections::HashSet;

use tracing::debug;

use super::tokenize::token_set;
use super::{ContentMatch, ContentMatcher, excerpt_for};
use crate::crawler::CrawledPage;
use crate::crawler::storage::SiteIndex;

struct IndexedPage {
    page: CrawledPage,
    words: HashSet<String>,
    title_words: HashSet<String>,
}

/// Scores pages by `|query ∩ page words| + 2 × |query ∩ title words|`
pub struct KeywordMatcher {
    pages: Vec<IndexedPage>,
    min_score: usize,
}

impl KeywordMatcher {
    pub const DEFAULT_MIN_SCORE: usize = 2;

    pub fn new(pages: impl IntoIterator<Item = CrawledPage>) -> Self {
        let pages = pages
            .into_iter()
            .map(|page| IndexedPage {
                words: token_set(&format!("{} {}", page.title, page.text)),
                title_words: token_set(&page.title),
                page,
            })
            .collect();
        Self {
            pages,
            min_score: Self::DEFAULT_MIN_SCORE,
        }
    }

    pub fn from_index(index: &SiteIndex) -> Self {
        Self::new(index.iter().cloned())
    }

    pub fn with_min_score(mut self, min_score: usize) -> Self {
        self.min_score = min_score;
        self
    }

    /// Overlap score of every page, in index order
    pub fn scores(&self, query: &str) -> Vec<usize> {
        let query = token_set(query);
        self.pages
            .iter()
            .map(|p| {
                p.words.intersection(&query).count() + 2 * p.title_words.intersection(&query).count()
            })
            .collect()
    }
}

impl ContentMatcher for KeywordMatcher {
    fn best_match(&self, query: &str) -> Option<ContentMatch> {
        let scores = self.scores(query);
        let (position, score) = scores
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, usize)>, (i, score)| match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((i, score)),
            })?;

        if score < self.min_score {
            debug!("Best keyword score {} below threshold", score);
            return None;
        }

        let page = &self.pages[position].page;
        let excerpt = excerpt_for(page, &token_set(query))?;
        Some(ContentMatch {
            url: page.url.clone(),
            title: page.title.clone(),
            score: score as f64,
            excerpt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::tests::page;

    #[test]
    fn test_title_matches_count_double() {
        let matcher = KeywordMatcher::new(vec![
            page("https://example.org/a", "Home", "volunteer programs for volunteer groups"),
            page("https://example.org/b", "Volunteer", "Join us."),
        ]);
        assert_eq!(matcher.scores("volunteer"), vec![1, 3]);

        let hit = matcher.best_match("volunteer").unwrap();
        assert_eq!(hit.url, "https://example.org/b");
        assert_eq!(hit.score, 3.0);
        assert_eq!(hit.excerpt, "Join us.");
    }

    #[test]
    fn test_threshold_and_ties() {
        let matcher = KeywordMatcher::new(vec![
            page("https://example.org/a", "A", "trees grow tall"),
            page("https://example.org/b", "B", "trees grow fast"),
        ]);
        assert!(matcher.best_match("trees").is_none());

        let hit = matcher.best_match("trees grow").unwrap();
        assert_eq!(hit.url, "https://example.org/a");

        let lenient = KeywordMatcher::new(vec![page("https://example.org/a", "A", "trees")])
            .with_min_score(1);
        assert!(lenient.best_match("trees").is_some());
    }
}
