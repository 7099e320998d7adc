//! JSON content cache for crawled sites and the JSON-lines site guide export

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{CrawlError, CrawledPage, Crawler};

/// Description used in the guide when a page has no text at all
const NO_DESCRIPTION: &str = "No meaningful description available.";

/// Characters of page text used as a fallback guide description
const GUIDE_DESCRIPTION_CHARS: usize = 500;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid URL for storage: {0}")]
    InvalidUrl(String),
}

impl From<StorageError> for CrawlError {
    fn from(err: StorageError) -> Self {
        CrawlError::Storage(err.to_string())
    }
}

impl From<StorageError> for crate::Error {
    fn from(err: StorageError) -> Self {
        CrawlError::from(err).into()
    }
}

type Result<T> = std::result::Result<T, StorageError>;

/// All pages recorded for one site, keyed by URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteIndex {
    pub base_url: String,
    pub crawled_at: DateTime<Utc>,
    pub pages: BTreeMap<String, CrawledPage>,
}

impl SiteIndex {
    pub fn new(base_url: impl Into<String>, pages: Vec<CrawledPage>) -> Self {
        Self {
            base_url: base_url.into(),
            crawled_at: Utc::now(),
            pages: pages.into_iter().map(|p| (p.url.clone(), p)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages in URL order
    pub fn iter(&self) -> impl Iterator<Item = &CrawledPage> {
        self.pages.values()
    }

    /// Whether the index is younger than `max_age`
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.crawled_at);
        age.to_std().map(|age| age < max_age).unwrap_or(true)
    }
}

/// One line of the exported site guide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideEntry {
    pub url: String,
    pub section_title: String,
    pub description: String,
    pub text: String,
}

impl From<&CrawledPage> for GuideEntry {
    fn from(page: &CrawledPage) -> Self {
        let description = match &page.description {
            Some(description) => description.clone(),
            None if page.text.trim().is_empty() => NO_DESCRIPTION.to_string(),
            None => page.text.chars().take(GUIDE_DESCRIPTION_CHARS).collect(),
        };
        Self {
            url: page.url.clone(),
            section_title: page.title.clone(),
            description,
            text: page.text.clone(),
        }
    }
}

/// File-backed cache of [`SiteIndex`] documents, one per domain
#[derive(Debug, Clone)]
pub struct Storage {
    base_path: PathBuf,
}

impl Default for Storage {
    fn default() -> Self {
        Self::new(".orgbot/crawler")
    }
}

impl Storage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Host of a URL without a leading `www.`
    pub fn domain(url: &str) -> Result<String> {
        let parsed = Url::parse(url)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| StorageError::InvalidUrl(url.to_string()))?;
        Ok(host.trim_start_matches("www.").to_string())
    }

    /// Path of the content file for a site
    pub fn path_for(&self, base_url: &str) -> Result<PathBuf> {
        let domain = Self::domain(base_url)?;
        Ok(self.base_path.join(format!("{}_content.json", domain)))
    }

    async fn ensure_parent(path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write the index to its content file
    pub async fn save(&self, index: &SiteIndex) -> Result<PathBuf> {
        let path = self.path_for(&index.base_url)?;
        Self::ensure_parent(&path).await?;
        fs::write(&path, serde_json::to_string_pretty(index)?).await?;
        debug!("Saved {} pages to {}", index.len(), path.display());
        Ok(path)
    }

    /// Read the cached index for a site; a missing file is `None`
    pub async fn load(&self, base_url: &str) -> Result<Option<SiteIndex>> {
        let path = self.path_for(base_url)?;
        match fs::read_to_string(&path).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Return the cached index when it is younger than `max_age`, otherwise
    /// crawl the site again and replace the cache
    #[instrument(skip(self, crawler))]
    pub async fn load_or_crawl(
        &self,
        base_url: &str,
        crawler: &Crawler,
        max_age: Duration,
    ) -> std::result::Result<SiteIndex, CrawlError> {
        match self.load(base_url).await {
            Ok(Some(index)) if index.is_fresh(max_age) => {
                info!("Using cached content for {} ({} pages)", base_url, index.len());
                return Ok(index);
            }
            Ok(Some(_)) => info!("Cached content for {} is stale", base_url),
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable content cache for {}: {}", base_url, e),
        }

        let pages = crawler.crawl(base_url).await?;
        let index = SiteIndex::new(base_url, pages);
        self.save(&index).await?;
        Ok(index)
    }

    /// Write one JSON object per page to `path`
    pub async fn export_guide(&self, index: &SiteIndex, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        Self::ensure_parent(path).await?;

        let mut out = String::new();
        for page in index.iter() {
            out.push_str(&serde_json::to_string(&GuideEntry::from(page))?);
            out.push('\n');
        }
        fs::write(path, out).await?;
        Ok(index.len())
    }
}
