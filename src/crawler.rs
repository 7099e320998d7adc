//! # Website Crawler Module
//!
//! This module crawls an organisation's website and records the content the
//! assistants later match user questions against. It is the first stage of the
//! content pipeline: pages gathered here are cached by [`storage`] and ranked by
//! the `matcher` module.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: page budget, depth, politeness and filtering settings
//! - `Crawler`: breadth-first crawler with priority-keyword ordering
//! - `CrawledPage`: title, description, visible text and links of one page
//! - `storage`: JSON content cache and JSON-lines site guide export
//!
//! ## Crawl Order
//!
//! Pages are visited breadth-first starting from the base URL. Links whose URL
//! contains one of the configured priority keywords ("about", "volunteer", ...)
//! are visited before any other queued link, so a small page budget is spent on
//! the pages that describe the organisation.

mod config;
mod content_extraction;
mod error;
mod frontier;
mod traversal;
pub mod storage;

pub use config::{CrawlerConfig, CrawlerConfigBuilder};
pub use content_extraction::{extract_page, is_valid_page, normalize_link, same_host, title_from_path};
pub use error::CrawlError;
pub use traversal::{CrawlProgress, Crawler, crawl_website};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a crawled page with its content and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawledPage {
    /// URL of the page
    pub url: String,

    /// Title of the page
    pub title: String,

    /// Meta description of the page
    pub description: Option<String>,

    /// Visible text of the page, whitespace-collapsed
    pub text: String,

    /// Outbound links found on the page
    pub links: Vec<String>,

    /// Whether the URL contains a priority keyword
    pub is_priority: bool,

    /// Link distance from the base URL
    pub depth: u32,

    /// When the page was fetched
    pub scraped_at: DateTime<Utc>,
}
