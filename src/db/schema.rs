//! Tables for crawled pages and archived conversations

use crate::db::error::DbError;
use libsql::{Connection, params};

/// Create the tables and indexes when they do not exist yet
pub async fn initialize_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS scraped_pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL UNIQUE,
            base_url TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            is_priority INTEGER NOT NULL DEFAULT 0,
            scraped_at TEXT NOT NULL
        )",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create scraped_pages table: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scraped_pages_base_url ON scraped_pages(base_url)",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index on scraped_pages: {}", e)))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS chatbot_conversations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user TEXT,
            chatbot_type TEXT NOT NULL,
            session_id TEXT NOT NULL,
            query TEXT NOT NULL,
            response TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )",
        params![],
    )
    .await
    .map_err(|e| {
        DbError::Schema(format!("Failed to create chatbot_conversations table: {}", e))
    })?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_conversations_session ON chatbot_conversations(session_id)",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index on conversations: {}", e)))?;

    Ok(())
}
