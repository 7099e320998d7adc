//! # Database Module
//!
//! libsql archive of crawled pages and finished chat sessions.
//!
//! - `scraped_pages`: one row per crawled URL, updated in place on re-crawl
//! - `chatbot_conversations`: one row per archived turn, grouped by session id

mod error;
pub mod schema;

pub use error::DbError;

use chrono::{DateTime, Utc};
use libsql::{Connection, Row, Value, params};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::bots::BotKind;
use crate::crawler::CrawledPage;
use crate::history::Turn;

/// Longest title stored for a page
pub const MAX_TITLE_CHARS: usize = 255;

/// A page row from `scraped_pages`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPage {
    pub url: String,
    pub base_url: String,
    pub title: String,
    pub content: String,
    pub is_priority: bool,
    pub scraped_at: DateTime<Utc>,
}

/// A turn row from `chatbot_conversations`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTurn {
    pub user: Option<String>,
    pub chatbot_type: String,
    pub session_id: String,
    pub query: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

fn text(row: &Row, idx: i32) -> Result<String, DbError> {
    match row.get_value(idx)? {
        Value::Text(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Err(DbError::Data(format!("Expected text in column {}, got {:?}", idx, other))),
    }
}

fn optional_text(row: &Row, idx: i32) -> Result<Option<String>, DbError> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s)),
        other => Err(DbError::Data(format!("Expected text in column {}, got {:?}", idx, other))),
    }
}

fn timestamp(row: &Row, idx: i32) -> Result<DateTime<Utc>, DbError> {
    let raw = text(row, idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DbError::Data(format!("Invalid timestamp '{}': {}", raw, e)))
}

/// Handle to the archive database
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Wrap an open connection, creating the schema if needed
    #[instrument(skip(conn))]
    pub async fn new(conn: Connection) -> Result<Self, DbError> {
        schema::initialize_schema(&conn).await?;
        Ok(Self { conn })
    }

    /// Open (or create) a local database file
    pub async fn open(path: &str) -> Result<Self, DbError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DbError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| DbError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn).await
    }

    pub async fn open_in_memory() -> Result<Self, DbError> {
        Self::open(":memory:").await
    }

    /// Archive every turn of a session under a fresh session id
    #[instrument(skip(self, history), fields(turns = history.len()))]
    pub async fn store_session(
        &self,
        history: &[Turn],
        user: Option<&str>,
        kind: BotKind,
    ) -> Result<String, DbError> {
        let session_id = Uuid::new_v4().to_string();
        let user = user.map_or(Value::Null, |u| Value::Text(u.to_string()));

        let tx = self.conn.transaction().await?;
        for turn in history {
            tx.execute(
                "INSERT INTO chatbot_conversations
                 (user, chatbot_type, session_id, query, response, timestamp)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    user.clone(),
                    kind.slug(),
                    session_id.clone(),
                    turn.user.clone(),
                    turn.bot.clone(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to store turn: {}", e)))?;
        }
        tx.commit().await?;

        info!("Stored session {} with {} turns", session_id, history.len());
        Ok(session_id)
    }

    /// Turns of an archived session in insertion order
    pub async fn session(&self, session_id: &str) -> Result<Vec<StoredTurn>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT user, chatbot_type, session_id, query, response, timestamp
                 FROM chatbot_conversations
                 WHERE session_id = ?
                 ORDER BY id",
                params![session_id],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to get session: {}", e)))?;

        let mut turns = Vec::new();
        while let Some(row) = rows.next().await? {
            turns.push(StoredTurn {
                user: optional_text(&row, 0)?,
                chatbot_type: text(&row, 1)?,
                session_id: text(&row, 2)?,
                query: text(&row, 3)?,
                response: text(&row, 4)?,
                timestamp: timestamp(&row, 5)?,
            });
        }
        Ok(turns)
    }

    pub async fn page_exists(&self, url: &str) -> Result<bool, DbError> {
        let mut rows = self
            .conn
            .query("SELECT 1 FROM scraped_pages WHERE url = ?", params![url])
            .await
            .map_err(|e| DbError::Query(format!("Failed to look up page: {}", e)))?;
        Ok(rows.next().await?.is_some())
    }

    /// Insert a page, or update the stored copy of the same URL
    ///
    /// Titles longer than [`MAX_TITLE_CHARS`] are truncated.
    pub async fn save_page(&self, page: &CrawledPage, base_url: &str) -> Result<(), DbError> {
        let title: String = page.title.chars().take(MAX_TITLE_CHARS).collect();
        self.conn
            .execute(
                "INSERT INTO scraped_pages (url, base_url, title, content, is_priority, scraped_at)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(url) DO UPDATE SET
                 base_url = excluded.base_url,
                 title = excluded.title,
                 content = excluded.content,
                 is_priority = excluded.is_priority,
                 scraped_at = excluded.scraped_at",
                params![
                    page.url.clone(),
                    base_url,
                    title,
                    page.text.clone(),
                    page.is_priority as i64,
                    page.scraped_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to save page: {}", e)))?;
        debug!("Saved page {}", page.url);
        Ok(())
    }

    /// Pages crawled from a site, priority pages first
    pub async fn pages_for_base(&self, base_url: &str) -> Result<Vec<StoredPage>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT url, base_url, title, content, is_priority, scraped_at
                 FROM scraped_pages
                 WHERE base_url = ?
                 ORDER BY is_priority DESC, id",
                params![base_url],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to get pages: {}", e)))?;

        let mut pages = Vec::new();
        while let Some(row) = rows.next().await? {
            pages.push(StoredPage {
                url: text(&row, 0)?,
                base_url: text(&row, 1)?,
                title: text(&row, 2)?,
                content: text(&row, 3)?,
                is_priority: row.get::<i64>(4)? != 0,
                scraped_at: timestamp(&row, 5)?,
            });
        }
        Ok(pages)
    }

    pub async fn count_pages(&self, base_url: &str) -> Result<usize, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM scraped_pages WHERE base_url = ?",
                params![base_url],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to count pages: {}", e)))?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?.max(0) as usize),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn page(url: &str, title: &str, is_priority: bool) -> CrawledPage {
        CrawledPage {
            url: url.to_string(),
            title: title.to_string(),
            description: None,
            text: format!("Content of {}", url),
            links: Vec::new(),
            is_priority,
            depth: 0,
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_store_and_read_session() {
        let db = Database::open_in_memory().await.unwrap();
        let history = vec![
            Turn::new("hi", "Hello!"),
            Turn::new("what do you do?", "We plant trees."),
        ];

        let session_id = db
            .store_session(&history, Some("asha"), BotKind::Gmtt)
            .await
            .unwrap();
        assert!(Uuid::parse_str(&session_id).is_ok());

        let turns = db.session(&session_id).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].query, "hi");
        assert_eq!(turns[1].response, "We plant trees.");
        assert_eq!(turns[0].user.as_deref(), Some("asha"));
        assert_eq!(turns[0].chatbot_type, "gmtt");

        let anonymous = db.store_session(&history[..1], None, BotKind::Indeed).await.unwrap();
        assert_ne!(anonymous, session_id);
        assert!(db.session(&anonymous).await.unwrap()[0].user.is_none());
        assert!(db.session("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pages_are_upserted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orgbot.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let base = "https://example.org";

        assert!(!db.page_exists("https://example.org/").await.unwrap());

        db.save_page(&page("https://example.org/", "Home", false), base)
            .await
            .unwrap();
        db.save_page(&page("https://example.org/about", &"A".repeat(300), true), base)
            .await
            .unwrap();
        db.save_page(&page("https://example.org/", "Home again", false), base)
            .await
            .unwrap();
        db.save_page(&page("https://other.org/", "Other", false), "https://other.org")
            .await
            .unwrap();

        assert!(db.page_exists("https://example.org/").await.unwrap());
        assert_eq!(db.count_pages(base).await.unwrap(), 2);

        let pages = db.pages_for_base(base).await.unwrap();
        assert_eq!(pages[0].url, "https://example.org/about");
        assert!(pages[0].is_priority);
        assert_eq!(pages[0].title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(pages[1].title, "Home again");
    }
}
