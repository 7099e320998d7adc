//! Breadth-first website traversal

use std::collections::HashSet;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::CONTENT_TYPE;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::content_extraction::{extract_page, is_valid_page, normalize_link, same_host};
use crate::crawler::error::CrawlError;
use crate::crawler::frontier::Frontier;
use crate::crawler::{CrawledPage, CrawlerConfig};

/// Progress event emitted after each recorded page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlProgress {
    /// URL of the page that was just recorded
    pub url: String,
    /// Pages recorded so far
    pub pages_crawled: usize,
    /// URLs still waiting in the frontier
    pub queued: usize,
}

/// Same-site crawler that visits priority pages first
pub struct Crawler {
    config: CrawlerConfig,
    client: reqwest::Client,
    known_urls: HashSet<String>,
    progress: Option<mpsc::Sender<CrawlProgress>>,
}

impl Crawler {
    /// Create a crawler with its own HTTP client
    pub fn new(config: CrawlerConfig) -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            config,
            client,
            known_urls: HashSet::new(),
            progress: None,
        })
    }

    /// URLs that are already stored; they are neither fetched nor expanded
    pub fn with_known_urls(mut self, urls: impl IntoIterator<Item = String>) -> Self {
        self.known_urls.extend(urls);
        self
    }

    /// Send a [`CrawlProgress`] event for every recorded page
    pub fn with_progress(mut self, sender: mpsc::Sender<CrawlProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    fn limiter(&self) -> Option<DefaultDirectRateLimiter> {
        Quota::with_period(self.config.rate_limit()).map(RateLimiter::direct)
    }

    /// Crawl the site rooted at `base_url`
    ///
    /// Pages that fail to download, answer with a non-success status or are
    /// not `text/html` are skipped; only an unparsable base URL is an error.
    #[instrument(skip(self), fields(max_pages = self.config.max_pages, max_depth = self.config.max_depth))]
    pub async fn crawl(&self, base_url: &str) -> Result<Vec<CrawledPage>, CrawlError> {
        let parsed = Url::parse(base_url)?;
        let base = normalize_link(&parsed, parsed.as_str())
            .ok_or_else(|| CrawlError::Other(format!("Not an HTTP URL: {}", base_url)))?;
        info!("Starting crawl for {}", base);

        let limiter = self.limiter();
        let max_pages = self.config.max_pages as usize;
        let mut frontier = Frontier::new();
        let mut pages = Vec::new();

        frontier.push(base.to_string(), 0, self.config.is_priority(base.as_str()));

        while pages.len() < max_pages {
            let Some(next) = frontier.pop() else {
                break;
            };
            if self.known_urls.contains(&next.url) {
                debug!("Skipping already stored page {}", next.url);
                continue;
            }

            if let Some(limiter) = &limiter {
                limiter.until_ready().await;
            }

            let html = match self.fetch_html(&next.url).await {
                Ok(Some(html)) => html,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to fetch {}: {}", next.url, e);
                    continue;
                }
            };

            let url = Url::parse(&next.url)?;
            let page = extract_page(&url, &html, &self.config, next.depth);

            if next.depth < self.config.max_depth {
                for link in &page.links {
                    let Ok(link_url) = Url::parse(link) else {
                        continue;
                    };
                    if !same_host(&base, &link_url)
                        || !is_valid_page(&link_url, &self.config.disallowed_extensions)
                    {
                        continue;
                    }
                    frontier.push(link.clone(), next.depth + 1, self.config.is_priority(link));
                }
            }

            debug!(url = %page.url, priority = page.is_priority, "Recorded page");
            pages.push(page);

            if let Some(sender) = &self.progress {
                let event = CrawlProgress {
                    url: next.url.clone(),
                    pages_crawled: pages.len(),
                    queued: frontier.len(),
                };
                if sender.send(event).await.is_err() {
                    debug!("Progress receiver dropped");
                }
            }
        }

        info!("Crawl finished with {} pages", pages.len());
        Ok(pages)
    }

    /// Fetch a page body, returning `None` when the response is not usable HTML
    #[instrument(skip(self))]
    async fn fetch_html(&self, url: &str) -> Result<Option<String>, CrawlError> {
        let attempts = self.config.max_retries.max(1);
        let mut attempt = 0;

        let response = loop {
            attempt += 1;
            match self.client.get(url).send().await {
                Ok(response) => break response,
                Err(e) if attempt < attempts => {
                    warn!("Attempt {}/{} for {} failed: {}", attempt, attempts, url, e);
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!("Skipping {}: status {}", url, status);
            return Ok(None);
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_lowercase().contains("text/html"))
            .unwrap_or(false);
        if !is_html {
            debug!("Skipping non-HTML page {}", url);
            return Ok(None);
        }

        Ok(Some(response.text().await?))
    }
}

/// Crawl a website with a fresh [`Crawler`]
pub async fn crawl_website(
    url: &str,
    config: CrawlerConfig,
) -> Result<Vec<CrawledPage>, CrawlError> {
    Crawler::new(config)?.crawl(url).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_config() -> CrawlerConfig {
        CrawlerConfig::builder()
            .rate_limit_ms(0)
            .retry_delay_ms(0)
            .max_retries(1)
            .build()
    }

    fn html_page(body: &str) -> String {
        format!("<html><head><title>Page</title></head><body>{}</body></html>", body)
    }

    async fn mock_html(server: &mut mockito::ServerGuard, path: &str, body: &str) -> mockito::Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(html_page(body))
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_priority_links_are_crawled_first() {
        let mut server = Server::new_async().await;
        let base = server.url();

        mock_html(
            &mut server,
            "/",
            r#"<a href="/contact">Contact</a><a href="/blog">Blog</a><a href="/about-us">About</a>"#,
        )
        .await;
        mock_html(&mut server, "/contact", "Contact page").await;
        mock_html(&mut server, "/blog", "Blog page").await;
        mock_html(&mut server, "/about-us", "About page").await;

        let pages = crawl_website(&base, test_config()).await.unwrap();
        let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();

        assert_eq!(
            urls,
            vec![
                format!("{}/", base),
                format!("{}/about-us", base),
                format!("{}/contact", base),
                format!("{}/blog", base),
            ]
        );
        assert!(pages[1].is_priority);
        assert_eq!(pages[1].depth, 1);
    }

    #[tokio::test]
    async fn test_page_budget_and_depth_are_respected() {
        let mut server = Server::new_async().await;
        let base = server.url();

        mock_html(&mut server, "/", r#"<a href="/a">A</a><a href="/b">B</a>"#).await;
        mock_html(&mut server, "/a", r#"<a href="/a/deeper">Deeper</a>"#).await;
        mock_html(&mut server, "/b", "B").await;
        let deeper = server
            .mock("GET", "/a/deeper")
            .with_status(200)
            .expect(0)
            .create_async()
            .await;

        let config = CrawlerConfig::builder()
            .rate_limit_ms(0)
            .max_depth(1)
            .build();
        let pages = crawl_website(&base, config).await.unwrap();
        assert_eq!(pages.len(), 3);
        deeper.assert_async().await;

        let config = CrawlerConfig::builder()
            .rate_limit_ms(0)
            .max_pages(2)
            .build();
        let pages = crawl_website(&base, config).await.unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[tokio::test]
    async fn test_skips_non_html_failures_and_foreign_links() {
        let mut server = Server::new_async().await;
        let base = server.url();

        mock_html(
            &mut server,
            "/",
            r#"
            <a href="/feed">Feed</a>
            <a href="/missing">Missing</a>
            <a href="/logo.png">Logo</a>
            <a href="https://elsewhere.example.com/about">Elsewhere</a>
            <a href="/ok.html">Ok</a>
            "#,
        )
        .await;
        server
            .mock("GET", "/feed")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;
        let logo = server
            .mock("GET", "/logo.png")
            .expect(0)
            .create_async()
            .await;
        mock_html(&mut server, "/ok.html", "Fine").await;

        let pages = crawl_website(&base, test_config()).await.unwrap();
        let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();

        assert_eq!(urls, vec![format!("{}/", base), format!("{}/ok.html", base)]);
        logo.assert_async().await;
    }

    #[tokio::test]
    async fn test_known_urls_are_not_fetched() {
        let mut server = Server::new_async().await;
        let base = server.url();

        mock_html(&mut server, "/", r#"<a href="/about">About</a>"#).await;
        let about = server.mock("GET", "/about").expect(0).create_async().await;

        let (tx, mut rx) = mpsc::channel(10);
        let crawler = Crawler::new(test_config())
            .unwrap()
            .with_known_urls(vec![format!("{}/about", base)])
            .with_progress(tx);

        let pages = crawler.crawl(&base).await.unwrap();
        drop(crawler);

        assert_eq!(pages.len(), 1);
        about.assert_async().await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.pages_crawled, 1);
        assert_eq!(event.url, format!("{}/", base));
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_an_error() {
        let result = crawl_website("not a url", test_config()).await;
        assert!(matches!(result, Err(CrawlError::UrlParse(_))));
    }
    /// Local server that drops the first `failures` connections without
    /// answering, then serves a small HTML page; returns its URL and the
    /// number of connections accepted
    async fn flaky_server(failures: usize) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let connections = Arc::new(AtomicUsize::new(0));

        let seen = connections.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                if seen.fetch_add(1, Ordering::SeqCst) < failures {
                    drop(socket);
                    continue;
                }
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let body = html_page("Back online");
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (url, connections)
    }

    #[tokio::test]
    async fn test_failed_request_is_retried() {
        let (base, connections) = flaky_server(1).await;
        let config = CrawlerConfig::builder()
            .rate_limit_ms(0)
            .retry_delay_ms(10)
            .max_retries(3)
            .build();

        let pages = crawl_website(&base, config).await.unwrap();

        assert_eq!(pages.len(), 1);
        assert!(pages[0].text.contains("Back online"));
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let (base, connections) = flaky_server(usize::MAX).await;
        let config = CrawlerConfig::builder()
            .rate_limit_ms(0)
            .retry_delay_ms(10)
            .max_retries(2)
            .build();

        let pages = crawl_website(&base, config).await.unwrap();

        assert!(pages.is_empty());
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }
}
