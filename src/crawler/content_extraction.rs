//! Content extraction functionality for the crawler module

use std::collections::HashSet;

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use crate::crawler::{CrawledPage, CrawlerConfig};

/// Extensions a page URL may end with
const ALLOWED_PAGE_EXTENSIONS: &[&str] = &[".php", ".html", ".htm"];

/// Fallback title when a page offers nothing better
const NO_TITLE: &str = "No Title";

/// Resolve an `href` against the page it was found on
///
/// Returns `None` for non-navigational links (`mailto:`, `tel:`,
/// `javascript:`, fragment-only) and for non-HTTP schemes. The fragment is
/// dropped and a trailing `/` is trimmed from any path other than the root so
/// that `/about/` and `/about#team` both normalise to `/about`.
pub fn normalize_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    let lower = href.to_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("javascript:")
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }
    Some(url)
}

/// Whether a URL looks like an HTML page worth fetching
///
/// Disallowed extensions anywhere at the end of the path are rejected. When the
/// last path segment carries an extension it must be one of the page
/// extensions (`.php`, `.html`, `.htm`).
pub fn is_valid_page(url: &Url, disallowed_extensions: &[String]) -> bool {
    let path = url.path().to_lowercase();
    if disallowed_extensions
        .iter()
        .any(|ext| path.ends_with(&ext.to_lowercase()))
    {
        return false;
    }

    let last_segment = path.rsplit('/').next().unwrap_or_default();
    if last_segment.contains('.') {
        return ALLOWED_PAGE_EXTENSIONS
            .iter()
            .any(|ext| last_segment.ends_with(ext));
    }
    true
}

/// Whether two URLs live on the same host, ignoring a leading `www.`
pub fn same_host(a: &Url, b: &Url) -> bool {
    fn bare(url: &Url) -> Option<String> {
        url.host_str()
            .map(|h| h.trim_start_matches("www.").to_lowercase())
    }
    bare(a).is_some() && bare(a) == bare(b) && a.port_or_known_default() == b.port_or_known_default()
}

/// Derive a readable title from the last path segment (`our-story` → `Our Story`)
pub fn title_from_path(url: &Url) -> Option<String> {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())?;
    let stem = segment.split('.').next().unwrap_or(segment);

    let words: Vec<String> = stem
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// Collapse runs of whitespace into single spaces
pub(crate) fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Failed to parse selector '{}': {}", selector, e);
            None
        }
    }
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = parse_selector(selector)?;
    document
        .select(&selector)
        .map(|element| clean_text(&element.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

/// Visible text of a document, excluding text under any excluded selector
fn visible_text(document: &Html, exclude_selectors: &[String], max_chars: usize) -> String {
    let excluded: HashSet<_> = exclude_selectors
        .iter()
        .filter_map(|s| parse_selector(s))
        .flat_map(|selector| {
            document
                .select(&selector)
                .map(|element| element.id())
                .collect::<Vec<_>>()
        })
        .collect();

    let pieces: Vec<&str> = document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            if node.ancestors().any(|ancestor| excluded.contains(&ancestor.id())) {
                return None;
            }
            let trimmed = text.trim();
            (!trimmed.is_empty()).then_some(trimmed)
        })
        .collect();

    clean_text(&pieces.join(" ")).chars().take(max_chars).collect()
}

fn extract_links(document: &Html, page_url: &Url) -> Vec<String> {
    let Some(selector) = parse_selector("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    document
        .select(&selector)
        .filter_map(|element: ElementRef| element.value().attr("href"))
        .filter_map(|href| normalize_link(page_url, href))
        .map(|url| url.to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Extract a [`CrawledPage`] from a fetched HTML document
///
/// The title falls back from `<title>` to the first `<h1>`, the first `<h2>`
/// and finally a title derived from the URL path.
pub fn extract_page(url: &Url, html: &str, config: &CrawlerConfig, depth: u32) -> CrawledPage {
    let document = Html::parse_document(html);

    let title = first_text(&document, "title")
        .or_else(|| first_text(&document, "h1"))
        .or_else(|| first_text(&document, "h2"))
        .or_else(|| title_from_path(url))
        .unwrap_or_else(|| NO_TITLE.to_string());

    let description = parse_selector("meta[name='description']").and_then(|selector| {
        document
            .select(&selector)
            .next()
            .and_then(|element| element.value().attr("content"))
            .map(clean_text)
            .filter(|content| !content.is_empty())
    });

    CrawledPage {
        url: url.to_string(),
        title,
        description,
        text: visible_text(&document, &config.exclude_selectors, config.max_text_chars),
        links: extract_links(&document, url),
        is_priority: config.is_priority(url.as_str()),
        depth,
        scraped_at: Utc::now(),
    }
}
