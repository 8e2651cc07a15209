//! Append-only message history in SQLite.
//!
//! The history log is keyed by the unordered pair of participants: the same
//! rows answer `history(a, b)` and `history(b, a)`. The live delivery path
//! only appends; reads serve the conversation-open fetch.

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::models::{Message, MessageSender};

type MessageRow = (String, String, String, String, String, String);

/// SQLite-backed message history store.
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    /// Create the store, initializing the schema if needed.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                sender_id TEXT NOT NULL,
                sender_username TEXT NOT NULL,
                recipient_id TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_pair \
             ON messages (sender_id, recipient_id, created_at)",
        )
        .execute(&pool)
        .await?;

        info!("[Store] Message history initialized");

        Ok(Self { pool })
    }

    /// Append one message to the history log.
    pub async fn append(&self, message: &Message) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO messages (id, sender_id, sender_username, recipient_id, text, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.sender.id)
        .bind(&message.sender.username)
        .bind(&message.recipient_id)
        .bind(&message.text)
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All messages between two users, oldest first.
    pub async fn history(&self, a: &str, b: &str) -> sqlx::Result<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, sender_id, sender_username, recipient_id, text, created_at \
             FROM messages \
             WHERE (sender_id = ? AND recipient_id = ?) OR (sender_id = ? AND recipient_id = ?) \
             ORDER BY created_at, rowid",
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, sender_id, sender_username, recipient_id, text, created_at)| Message {
                    id,
                    sender: MessageSender {
                        id: sender_id,
                        username: sender_username,
                    },
                    recipient_id,
                    text,
                    created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
                },
            )
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::tempdir;

    async fn test_store(dir: &std::path::Path) -> MessageStore {
        let pool = db::connect(&dir.join("test.sqlite")).await.unwrap();
        MessageStore::new(pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_append_and_history_order() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path()).await;

        store
            .append(&Message::new("a1", "alice", "b1", "first"))
            .await
            .unwrap();
        store
            .append(&Message::new("b1", "bob", "a1", "second"))
            .await
            .unwrap();
        store
            .append(&Message::new("a1", "alice", "b1", "third"))
            .await
            .unwrap();

        let history = store.history("a1", "b1").await.unwrap();
        let texts: Vec<&str> = history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_history_pair_is_symmetric() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path()).await;

        store
            .append(&Message::new("a1", "alice", "b1", "hi"))
            .await
            .unwrap();

        assert_eq!(
            store.history("a1", "b1").await.unwrap(),
            store.history("b1", "a1").await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_history_excludes_other_pairs() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path()).await;

        store
            .append(&Message::new("a1", "alice", "b1", "for bob"))
            .await
            .unwrap();
        store
            .append(&Message::new("a1", "alice", "c1", "for carol"))
            .await
            .unwrap();

        let history = store.history("a1", "b1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "for bob");
    }
}
