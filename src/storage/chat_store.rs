//! `SQLite`-backed store for chat sessions and messages.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::str::FromStr;

use tokio_rusqlite::Connection;

use crate::chat::types::{ChatMessage, MessageRole, SessionMeta};
use crate::storage::errors::{StorageError, StorageResult};

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for session and message storage.
///
/// Timestamps are passed in by the caller (milliseconds since the Unix
/// epoch) so ordering is deterministic and testable.
pub trait ChatStore: Send + Sync {
    /// Create a session and return its identifier.
    fn create_session(&self, title: String, now_ms: i64) -> StoreFuture<'_, StorageResult<i64>>;

    /// Update a session title and refresh `updated_at`.
    ///
    /// Returns `false` when no row matched; permissive update semantics, the
    /// missing identifier is not an error at this layer.
    fn rename_session(
        &self,
        session_id: i64,
        title: String,
        now_ms: i64,
    ) -> StoreFuture<'_, StorageResult<bool>>;

    /// Append a message to a session.
    ///
    /// Fails with a foreign-key violation if the session does not exist.
    fn save_message(
        &self,
        session_id: i64,
        role: MessageRole,
        content: String,
        now_ms: i64,
    ) -> StoreFuture<'_, StorageResult<()>>;

    /// Append a message and, when it is the session's first message and the
    /// role is user, derive the session title from a truncated prefix of the
    /// content. Insert and title update run in one transaction.
    ///
    /// Returns whether a title was derived.
    fn save_message_with_title(
        &self,
        session_id: i64,
        role: MessageRole,
        content: String,
        now_ms: i64,
        title_max: usize,
    ) -> StoreFuture<'_, StorageResult<bool>>;

    /// List all sessions, most recently updated first, each with a derived
    /// message count.
    fn list_sessions(&self) -> StoreFuture<'_, StorageResult<Vec<SessionMeta>>>;

    /// Load all messages for a session in insertion order.
    fn session_messages(&self, session_id: i64)
    -> StoreFuture<'_, StorageResult<Vec<ChatMessage>>>;

    /// Delete a session and, via schema cascade, all of its messages.
    ///
    /// Returns `false` when no row matched.
    fn delete_session(&self, session_id: i64) -> StoreFuture<'_, StorageResult<bool>>;

    /// Check whether a session exists.
    fn session_exists(&self, session_id: i64) -> StoreFuture<'_, StorageResult<bool>>;
}

/// `SQLite` implementation of [`ChatStore`].
pub struct SqliteChatStore {
    conn: Connection,
}

impl SqliteChatStore {
    /// Open the database file and create the schema if it does not exist.
    ///
    /// WAL journal mode keeps session-list reads from blocking an in-flight
    /// message write; `foreign_keys` enables the cascade delete.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialized.
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path.as_ref().to_path_buf()).await?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                PRAGMA foreign_keys = ON;
                CREATE TABLE IF NOT EXISTS chat_sessions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    session_id INTEGER NOT NULL
                        REFERENCES chat_sessions (id) ON DELETE CASCADE,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_messages_session
                    ON messages (session_id);
                CREATE INDEX IF NOT EXISTS idx_chat_sessions_updated
                    ON chat_sessions (updated_at DESC);",
            )?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }
}

/// Truncate message content into a sidebar title.
fn derive_title(content: &str, max_len: usize) -> String {
    let mut title: String = content.chars().take(max_len).collect();
    if content.chars().count() > max_len {
        title.push_str("...");
    }
    title
}

impl ChatStore for SqliteChatStore {
    fn create_session(&self, title: String, now_ms: i64) -> StoreFuture<'_, StorageResult<i64>> {
        Box::pin(async move {
            let id = self
                .conn
                .call(move |conn| {
                    conn.execute(
                        "INSERT INTO chat_sessions (title, created_at, updated_at)
                         VALUES (?1, ?2, ?2)",
                        rusqlite::params![title, now_ms],
                    )?;
                    Ok(conn.last_insert_rowid())
                })
                .await?;
            Ok(id)
        })
    }

    fn rename_session(
        &self,
        session_id: i64,
        title: String,
        now_ms: i64,
    ) -> StoreFuture<'_, StorageResult<bool>> {
        Box::pin(async move {
            let changed = self
                .conn
                .call(move |conn| {
                    let changed = conn.execute(
                        "UPDATE chat_sessions SET title = ?1, updated_at = ?2 WHERE id = ?3",
                        rusqlite::params![title, now_ms, session_id],
                    )?;
                    Ok(changed)
                })
                .await?;
            Ok(changed > 0)
        })
    }

    fn save_message(
        &self,
        session_id: i64,
        role: MessageRole,
        content: String,
        now_ms: i64,
    ) -> StoreFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            self.conn
                .call(move |conn| {
                    conn.execute(
                        "INSERT INTO messages (session_id, role, content, created_at)
                         VALUES (?1, ?2, ?3, ?4)",
                        rusqlite::params![session_id, role.as_str(), content, now_ms],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }

    fn save_message_with_title(
        &self,
        session_id: i64,
        role: MessageRole,
        content: String,
        now_ms: i64,
        title_max: usize,
    ) -> StoreFuture<'_, StorageResult<bool>> {
        Box::pin(async move {
            let derived = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    tx.execute(
                        "INSERT INTO messages (session_id, role, content, created_at)
                         VALUES (?1, ?2, ?3, ?4)",
                        rusqlite::params![session_id, role.as_str(), content, now_ms],
                    )?;

                    let mut derived = false;
                    if role == MessageRole::User {
                        let count: i64 = tx.query_row(
                            "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
                            rusqlite::params![session_id],
                            |row| row.get(0),
                        )?;
                        if count == 1 {
                            let title = derive_title(&content, title_max);
                            tx.execute(
                                "UPDATE chat_sessions SET title = ?1, updated_at = ?2
                                 WHERE id = ?3",
                                rusqlite::params![title, now_ms, session_id],
                            )?;
                            derived = true;
                        }
                    }

                    tx.commit()?;
                    Ok(derived)
                })
                .await?;
            Ok(derived)
        })
    }

    fn list_sessions(&self) -> StoreFuture<'_, StorageResult<Vec<SessionMeta>>> {
        Box::pin(async move {
            let rows = self
                .conn
                .call(|conn| {
                    let mut stmt = conn.prepare(
                        "SELECT id, title, created_at, updated_at,
                                (SELECT COUNT(*) FROM messages
                                 WHERE messages.session_id = chat_sessions.id)
                         FROM chat_sessions
                         ORDER BY updated_at DESC, id DESC",
                    )?;
                    let rows = stmt
                        .query_map([], |row| {
                            Ok(SessionMeta {
                                id: row.get(0)?,
                                title: row.get(1)?,
                                created_at: row.get(2)?,
                                updated_at: row.get(3)?,
                                message_count: row.get(4)?,
                            })
                        })?
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(rows)
                })
                .await?;
            Ok(rows)
        })
    }

    fn session_messages(
        &self,
        session_id: i64,
    ) -> StoreFuture<'_, StorageResult<Vec<ChatMessage>>> {
        Box::pin(async move {
            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(
                        "SELECT role, content, created_at
                         FROM messages
                         WHERE session_id = ?1
                         ORDER BY created_at, id",
                    )?;
                    let rows = stmt
                        .query_map(rusqlite::params![session_id], |row| {
                            let role: String = row.get(0)?;
                            let content: String = row.get(1)?;
                            let created_at: i64 = row.get(2)?;
                            Ok((role, content, created_at))
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            let mut messages = Vec::with_capacity(rows.len());
            for (role, content, created_at) in rows {
                let role = MessageRole::from_str(&role)
                    .map_err(|value| StorageError::InvalidRow(format!("invalid role: {value}")))?;
                messages.push(ChatMessage {
                    role,
                    content,
                    created_at,
                });
            }
            Ok(messages)
        })
    }

    fn delete_session(&self, session_id: i64) -> StoreFuture<'_, StorageResult<bool>> {
        Box::pin(async move {
            let deleted = self
                .conn
                .call(move |conn| {
                    let deleted = conn.execute(
                        "DELETE FROM chat_sessions WHERE id = ?1",
                        rusqlite::params![session_id],
                    )?;
                    Ok(deleted)
                })
                .await?;
            Ok(deleted > 0)
        })
    }

    fn session_exists(&self, session_id: i64) -> StoreFuture<'_, StorageResult<bool>> {
        Box::pin(async move {
            let exists = self
                .conn
                .call(move |conn| {
                    let count: i64 = conn.query_row(
                        "SELECT COUNT(*) FROM chat_sessions WHERE id = ?1",
                        rusqlite::params![session_id],
                        |row| row.get(0),
                    )?;
                    Ok(count > 0)
                })
                .await?;
            Ok(exists)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store(dir: &tempfile::TempDir) -> StorageResult<SqliteChatStore> {
        SqliteChatStore::open(dir.path().join("chats.db")).await
    }

    #[tokio::test]
    async fn messages_come_back_in_insertion_order() -> StorageResult<()> {
        let dir = tempfile::tempdir()?;
        let store = open_store(&dir).await?;
        let id = store.create_session("New Chat".to_string(), 1_000).await?;

        // Same timestamp for every row: the rowid must break the tie.
        for text in ["first", "second", "third"] {
            store
                .save_message(id, MessageRole::User, text.to_string(), 2_000)
                .await?;
        }

        let messages = store.session_messages(id).await?;
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
        Ok(())
    }

    #[tokio::test]
    async fn delete_cascades_to_messages() -> StorageResult<()> {
        let dir = tempfile::tempdir()?;
        let store = open_store(&dir).await?;
        let id = store.create_session("New Chat".to_string(), 1_000).await?;
        store
            .save_message(id, MessageRole::User, "Hi".to_string(), 1_001)
            .await?;
        store
            .save_message(id, MessageRole::Assistant, "Hello".to_string(), 1_002)
            .await?;

        assert!(store.delete_session(id).await?);
        assert!(store.session_messages(id).await?.is_empty());
        assert!(store.list_sessions().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn delete_unknown_session_reports_false() -> StorageResult<()> {
        let dir = tempfile::tempdir()?;
        let store = open_store(&dir).await?;
        assert!(!store.delete_session(42).await?);
        Ok(())
    }

    #[tokio::test]
    async fn rename_moves_session_to_front() -> StorageResult<()> {
        let dir = tempfile::tempdir()?;
        let store = open_store(&dir).await?;
        let a = store.create_session("A".to_string(), 1_000).await?;
        let b = store.create_session("B".to_string(), 2_000).await?;

        let sessions = store.list_sessions().await?;
        let ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, [b, a]);

        assert!(
            store
                .rename_session(a, "Renamed".to_string(), 3_000)
                .await?
        );
        let sessions = store.list_sessions().await?;
        let ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, [a, b]);
        assert_eq!(sessions[0].title, "Renamed");
        Ok(())
    }

    #[tokio::test]
    async fn rename_unknown_session_reports_false_and_changes_nothing() -> StorageResult<()> {
        let dir = tempfile::tempdir()?;
        let store = open_store(&dir).await?;
        let id = store.create_session("Only".to_string(), 1_000).await?;

        assert!(!store.rename_session(999, "X".to_string(), 2_000).await?);

        let sessions = store.list_sessions().await?;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, id);
        assert_eq!(sessions[0].title, "Only");
        assert_eq!(sessions[0].updated_at, 1_000);
        Ok(())
    }

    #[tokio::test]
    async fn create_then_list_round_trip() -> StorageResult<()> {
        let dir = tempfile::tempdir()?;
        let store = open_store(&dir).await?;
        store.create_session("X".to_string(), 1_000).await?;

        let sessions = store.list_sessions().await?;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].title, "X");
        assert_eq!(sessions[0].message_count, 0);
        assert_eq!(sessions[0].created_at, 1_000);
        Ok(())
    }

    #[tokio::test]
    async fn user_and_assistant_exchange_round_trip() -> StorageResult<()> {
        let dir = tempfile::tempdir()?;
        let store = open_store(&dir).await?;
        let id = store.create_session("New Chat".to_string(), 1_000).await?;
        store
            .save_message(id, MessageRole::User, "Hi".to_string(), 1_001)
            .await?;
        store
            .save_message(id, MessageRole::Assistant, "Hello".to_string(), 1_002)
            .await?;

        let messages = store.session_messages(id).await?;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "Hi");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].content, "Hello");

        let sessions = store.list_sessions().await?;
        assert_eq!(sessions[0].message_count, 2);
        Ok(())
    }

    #[tokio::test]
    async fn save_message_to_unknown_session_is_rejected() -> StorageResult<()> {
        let dir = tempfile::tempdir()?;
        let store = open_store(&dir).await?;
        let result = store
            .save_message(999, MessageRole::User, "orphan".to_string(), 1_000)
            .await;
        assert!(result.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn first_user_message_derives_title_once() -> StorageResult<()> {
        let dir = tempfile::tempdir()?;
        let store = open_store(&dir).await?;
        let id = store.create_session("New Chat".to_string(), 1_000).await?;

        let derived = store
            .save_message_with_title(
                id,
                MessageRole::User,
                "What is the capital of Iceland and why?".to_string(),
                1_001,
                30,
            )
            .await?;
        assert!(derived);

        let sessions = store.list_sessions().await?;
        assert_eq!(sessions[0].title, "What is the capital of Iceland...");

        let derived = store
            .save_message_with_title(id, MessageRole::User, "Thanks!".to_string(), 1_002, 30)
            .await?;
        assert!(!derived);
        let sessions = store.list_sessions().await?;
        assert_eq!(sessions[0].title, "What is the capital of Iceland...");
        Ok(())
    }

    #[test]
    fn short_content_is_kept_verbatim_as_title() {
        assert_eq!(derive_title("Hello", 30), "Hello");
        assert_eq!(derive_title("exactly-five!", 13), "exactly-five!");
        assert_eq!(derive_title("abcdef", 3), "abc...");
    }
}
