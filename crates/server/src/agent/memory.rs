//! Persistent agent memory on SQLite.
//!
//! # Database: `<persist_dir>/agent_memory.sqlite3`
//!
//! ```sql
//! CREATE TABLE memories (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     collection TEXT NOT NULL,
//!     kind TEXT NOT NULL,          -- text, conversation
//!     category TEXT,
//!     user_id TEXT,
//!     content TEXT NOT NULL,
//!     created_at TEXT NOT NULL
//! );
//! ```
//!
//! Rows are partitioned by collection so several agents can share one file.
//! Listing is newest first; there is no similarity ranking.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use thiserror::Error;
use tracing::instrument;

use crate::config::MemoryConfig;

/// File name of the memory database inside the persist directory.
pub const MEMORY_DB_FILE: &str = "agent_memory.sqlite3";

const CREATE_MEMORIES: &str = r"
    CREATE TABLE IF NOT EXISTS memories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        collection TEXT NOT NULL,
        kind TEXT NOT NULL,
        category TEXT,
        user_id TEXT,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
";

const CREATE_MEMORIES_INDEX: &str = r"
    CREATE INDEX IF NOT EXISTS idx_memories_collection_created
    ON memories(collection, created_at DESC)
";

/// Errors from the memory store.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// SQLite error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The persist directory could not be created.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row could not be decoded.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// What a memory row holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Free-form knowledge (business rules, schema notes).
    Text,
    /// An auto-saved question and answer.
    Conversation,
}

impl MemoryKind {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Conversation => "conversation",
        }
    }
}

impl std::str::FromStr for MemoryKind {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "conversation" => Ok(Self::Conversation),
            other => Err(MemoryError::DataCorruption(format!(
                "unknown memory kind '{other}'"
            ))),
        }
    }
}

/// A stored memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryRecord {
    /// Row ID.
    pub id: i64,
    /// Collection the row belongs to.
    pub collection: String,
    /// What the row holds.
    pub kind: MemoryKind,
    /// Optional grouping label for text memories.
    pub category: Option<String>,
    /// User a conversation belongs to.
    pub user_id: Option<String>,
    /// Memory body.
    pub content: String,
    /// When the row was written.
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MemoryRow {
    id: i64,
    collection: String,
    kind: String,
    category: Option<String>,
    user_id: Option<String>,
    content: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MemoryRow> for MemoryRecord {
    type Error = MemoryError;

    fn try_from(row: MemoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            collection: row.collection,
            kind: row.kind.parse()?,
            category: row.category,
            user_id: row.user_id,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

/// Agent memory backed by a local SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteAgentMemory {
    pool: SqlitePool,
    collection: String,
    path: PathBuf,
}

impl SqliteAgentMemory {
    /// Open (creating if needed) the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `MemoryError` if the directory or database cannot be created.
    pub async fn open(config: &MemoryConfig) -> Result<Self, MemoryError> {
        Self::open_in(&config.persist_dir, &config.collection).await
    }

    /// Open (creating if needed) the store in `dir` for `collection`.
    ///
    /// # Errors
    ///
    /// Returns `MemoryError` if the directory or database cannot be created.
    #[instrument(skip_all, fields(dir = %dir.display(), collection = %collection))]
    pub async fn open_in(dir: &Path, collection: &str) -> Result<Self, MemoryError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(MEMORY_DB_FILE);

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePool::connect_with(options).await?;

        sqlx::query(CREATE_MEMORIES).execute(&pool).await?;
        sqlx::query(CREATE_MEMORIES_INDEX).execute(&pool).await?;

        tracing::info!(path = %path.display(), "Agent memory opened");
        Ok(Self {
            pool,
            collection: collection.to_owned(),
            path,
        })
    }

    /// Collection this store reads and writes.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a piece of free-form knowledge.
    ///
    /// # Errors
    ///
    /// Returns `MemoryError::Database` if the insert fails.
    #[instrument(skip(self, content))]
    pub async fn save_text_memory(
        &self,
        content: &str,
        category: Option<&str>,
    ) -> Result<MemoryRecord, MemoryError> {
        self.insert(MemoryKind::Text, category, None, content).await
    }

    /// Store a completed question/answer exchange.
    ///
    /// # Errors
    ///
    /// Returns `MemoryError::Database` if the insert fails.
    #[instrument(skip(self, question, answer))]
    pub async fn save_conversation(
        &self,
        user_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<MemoryRecord, MemoryError> {
        let content = format!("Q: {question}\nA: {answer}");
        self.insert(MemoryKind::Conversation, None, Some(user_id), &content)
            .await
    }

    /// Most recent memories in this collection, newest first.
    ///
    /// # Errors
    ///
    /// Returns `MemoryError` if the query fails or a row is corrupt.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        kind: Option<MemoryKind>,
        limit: u32,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let rows = sqlx::query_as::<_, MemoryRow>(
            r"
            SELECT id, collection, kind, category, user_id, content, created_at
            FROM memories
            WHERE collection = ? AND (? IS NULL OR kind = ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            ",
        )
        .bind(&self.collection)
        .bind(kind.map(MemoryKind::as_str))
        .bind(kind.map(MemoryKind::as_str))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn insert(
        &self,
        kind: MemoryKind,
        category: Option<&str>,
        user_id: Option<&str>,
        content: &str,
    ) -> Result<MemoryRecord, MemoryError> {
        let created_at = Utc::now();
        let id = sqlx::query(
            r"
            INSERT INTO memories (collection, kind, category, user_id, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&self.collection)
        .bind(kind.as_str())
        .bind(category)
        .bind(user_id)
        .bind(content)
        .bind(created_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        tracing::debug!(id, kind = kind.as_str(), "Memory saved");
        Ok(MemoryRecord {
            id,
            collection: self.collection.clone(),
            kind,
            category: category.map(str::to_owned),
            user_id: user_id.map(str::to_owned),
            content: content.to_owned(),
            created_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("memory");
        let memory = SqliteAgentMemory::open_in(&nested, "tool_memories")
            .await
            .unwrap();
        assert!(nested.join(MEMORY_DB_FILE).exists());
        assert_eq!(memory.path(), nested.join(MEMORY_DB_FILE));
        assert_eq!(memory.collection(), "tool_memories");
    }

    #[tokio::test]
    async fn test_save_and_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let memory = SqliteAgentMemory::open_in(dir.path(), "tool_memories")
            .await
            .unwrap();

        let first = memory
            .save_text_memory("Revenue excludes refunds", Some("business_rules"))
            .await
            .unwrap();
        assert_eq!(first.kind, MemoryKind::Text);
        assert_eq!(first.category.as_deref(), Some("business_rules"));

        memory
            .save_conversation("a@x.com", "How many orders?", "42")
            .await
            .unwrap();

        let all = memory.list(None, 10).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind, MemoryKind::Conversation);
        assert_eq!(all[0].user_id.as_deref(), Some("a@x.com"));
        assert_eq!(all[0].content, "Q: How many orders?\nA: 42");
        assert_eq!(all[1].id, first.id);
    }

    #[tokio::test]
    async fn test_list_filters_by_kind_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let memory = SqliteAgentMemory::open_in(dir.path(), "tool_memories")
            .await
            .unwrap();

        for i in 0..3 {
            memory
                .save_text_memory(&format!("rule {i}"), None)
                .await
                .unwrap();
        }
        memory.save_conversation("u", "q", "a").await.unwrap();

        let text = memory.list(Some(MemoryKind::Text), 10).await.unwrap();
        assert_eq!(text.len(), 3);
        assert!(text.iter().all(|m| m.kind == MemoryKind::Text));

        let limited = memory.list(None, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let a = SqliteAgentMemory::open_in(dir.path(), "a").await.unwrap();
        let b = SqliteAgentMemory::open_in(dir.path(), "b").await.unwrap();

        a.save_text_memory("only in a", None).await.unwrap();

        assert_eq!(a.list(None, 10).await.unwrap().len(), 1);
        assert!(b.list(None, 10).await.unwrap().is_empty());
    }

    #[test]
    fn test_memory_kind_round_trip() {
        assert_eq!("text".parse::<MemoryKind>().unwrap(), MemoryKind::Text);
        assert_eq!(MemoryKind::Conversation.as_str(), "conversation");
        assert!("vector".parse::<MemoryKind>().is_err());
    }
}
