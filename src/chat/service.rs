//! Conversation service over the chat store and a completion backend.

use std::sync::Arc;

use serde::Serialize;

use crate::chat::errors::{ChatError, ChatResult};
use crate::chat::types::{ChatMessage, MessageRole, SessionMeta};
use crate::config::ChatConfig;
use crate::llm::CompletionBackend;
use crate::storage::ChatStore;

/// Current time in milliseconds since the Unix epoch.
fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Result of a successful message exchange.
#[derive(Clone, Debug, Serialize)]
pub struct SendOutcome {
    /// Session the exchange belongs to (created on demand).
    pub session_id: i64,
    /// Assistant reply text, already persisted.
    pub reply: String,
}

/// Stateless façade over storage and completion.
///
/// Session identifiers are threaded through every operation explicitly; the
/// "current session" pointer lives at the API boundary, not here, so the
/// service is safe to share across callers.
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    backend: Arc<dyn CompletionBackend>,
    config: ChatConfig,
}

impl ChatService {
    /// Create a service over the given store and backend.
    #[must_use]
    pub fn new(
        store: Arc<dyn ChatStore>,
        backend: Arc<dyn CompletionBackend>,
        config: ChatConfig,
    ) -> Self {
        Self {
            store,
            backend,
            config,
        }
    }

    /// Create a session with the configured placeholder title.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn create_session(&self) -> ChatResult<i64> {
        let id = self
            .store
            .create_session(self.config.default_title.clone(), now_ms())
            .await?;
        tracing::info!(session_id = id, "created new session");
        Ok(id)
    }

    /// List all sessions, most recently updated first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn list_sessions(&self) -> ChatResult<Vec<SessionMeta>> {
        Ok(self.store.list_sessions().await?)
    }

    /// Load the ordered message history of a session.
    ///
    /// Fails fast for an unknown identifier instead of silently returning an
    /// empty history.
    ///
    /// # Errors
    /// Returns [`ChatError::SessionNotFound`] for an unknown id, or a storage
    /// error.
    pub async fn load_session(&self, session_id: i64) -> ChatResult<Vec<ChatMessage>> {
        if !self.store.session_exists(session_id).await? {
            return Err(ChatError::SessionNotFound(session_id));
        }
        Ok(self.store.session_messages(session_id).await?)
    }

    /// Delete a session and its messages.
    ///
    /// Returns whether a session was actually removed.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn delete_session(&self, session_id: i64) -> ChatResult<bool> {
        let deleted = self.store.delete_session(session_id).await?;
        if deleted {
            tracing::info!(session_id, "deleted session");
        }
        Ok(deleted)
    }

    /// Rename a session.
    ///
    /// Returns `false` for an unknown identifier; a structured failure the
    /// caller can branch on without error handling.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn rename_session(&self, session_id: i64, title: &str) -> ChatResult<bool> {
        let renamed = self
            .store
            .rename_session(session_id, title.to_string(), now_ms())
            .await?;
        if renamed {
            tracing::debug!(session_id, title, "renamed session");
        }
        Ok(renamed)
    }

    /// Send a user message and return the persisted assistant reply.
    ///
    /// The user message is written before the completion call so it survives
    /// a failed call; the history read and the reply write are independent
    /// transactions, so no storage lock is held while the call is in flight.
    ///
    /// # Errors
    /// Returns [`ChatError::SessionNotFound`] for an unknown explicit id,
    /// [`ChatError::CompletionFailed`] when the external call fails (no
    /// assistant message persisted), or a storage error.
    pub async fn send_message(
        &self,
        session_id: Option<i64>,
        text: &str,
    ) -> ChatResult<SendOutcome> {
        let session_id = match session_id {
            Some(id) => {
                if !self.store.session_exists(id).await? {
                    return Err(ChatError::SessionNotFound(id));
                }
                id
            }
            None => self.create_session().await?,
        };

        if self.config.derive_titles {
            self.store
                .save_message_with_title(
                    session_id,
                    MessageRole::User,
                    text.to_string(),
                    now_ms(),
                    self.config.title_max_len,
                )
                .await?;
        } else {
            self.store
                .save_message(session_id, MessageRole::User, text.to_string(), now_ms())
                .await?;
        }

        let history = self.store.session_messages(session_id).await?;

        let reply = match self.backend.complete(&history).await {
            Ok(reply) => reply,
            Err(source) => {
                tracing::warn!(session_id, error = %source, "completion call failed");
                return Err(ChatError::CompletionFailed { session_id, source });
            }
        };

        self.store
            .save_message(session_id, MessageRole::Assistant, reply.clone(), now_ms())
            .await?;

        Ok(SendOutcome { session_id, reply })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::CompletionError;
    use crate::storage::SqliteChatStore;

    /// Backend that replies with canned text or simulates an outage, and
    /// records the history length it was handed.
    struct FakeBackend {
        reply: Option<String>,
        seen_history_len: Mutex<usize>,
    }

    impl FakeBackend {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                seen_history_len: Mutex::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                seen_history_len: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for FakeBackend {
        async fn complete(&self, history: &[ChatMessage]) -> Result<String, CompletionError> {
            if let Ok(mut seen) = self.seen_history_len.lock() {
                *seen = history.len();
            }
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(CompletionError::Api {
                    status: 503,
                    message: "simulated outage".to_string(),
                }),
            }
        }
    }

    async fn service_with(
        dir: &tempfile::TempDir,
        backend: Arc<FakeBackend>,
        config: ChatConfig,
    ) -> ChatResult<ChatService> {
        let store = SqliteChatStore::open(dir.path().join("chats.db")).await?;
        Ok(ChatService::new(Arc::new(store), backend, config))
    }

    #[tokio::test]
    async fn send_without_session_creates_one_and_persists_both_turns() -> ChatResult<()> {
        let dir = tempfile::tempdir().map_err(crate::storage::StorageError::from)?;
        let backend = Arc::new(FakeBackend::replying("Hello"));
        let service = service_with(&dir, Arc::clone(&backend), ChatConfig::default()).await?;

        let outcome = service.send_message(None, "Hi").await?;
        assert_eq!(outcome.reply, "Hello");

        let messages = service.load_session(outcome.session_id).await?;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "Hi");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].content, "Hello");
        Ok(())
    }

    #[tokio::test]
    async fn failed_completion_keeps_user_message_and_writes_no_reply() -> ChatResult<()> {
        let dir = tempfile::tempdir().map_err(crate::storage::StorageError::from)?;
        let backend = Arc::new(FakeBackend::failing());
        let service = service_with(&dir, backend, ChatConfig::default()).await?;

        let result = service.send_message(None, "Hi").await;
        assert!(matches!(result, Err(ChatError::CompletionFailed { .. })));

        // The implicitly created session holds exactly the user message.
        let sessions = service.list_sessions().await?;
        assert_eq!(sessions.len(), 1);
        let messages = service.load_session(sessions[0].id).await?;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "Hi");
        Ok(())
    }

    #[tokio::test]
    async fn send_to_unknown_session_fails_fast() -> ChatResult<()> {
        let dir = tempfile::tempdir().map_err(crate::storage::StorageError::from)?;
        let backend = Arc::new(FakeBackend::replying("unused"));
        let service = service_with(&dir, backend, ChatConfig::default()).await?;

        let result = service.send_message(Some(999), "Hi").await;
        assert!(matches!(result, Err(ChatError::SessionNotFound(999))));
        assert!(service.list_sessions().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn completion_receives_full_history_in_order() -> ChatResult<()> {
        let dir = tempfile::tempdir().map_err(crate::storage::StorageError::from)?;
        let backend = Arc::new(FakeBackend::replying("ack"));
        let service = service_with(&dir, Arc::clone(&backend), ChatConfig::default()).await?;

        let outcome = service.send_message(None, "one").await?;
        service
            .send_message(Some(outcome.session_id), "two")
            .await?;

        // Second call: prior user+assistant turns plus the new user message.
        let seen = backend
            .seen_history_len
            .lock()
            .map(|seen| *seen)
            .unwrap_or_default();
        assert_eq!(seen, 3);
        Ok(())
    }

    #[tokio::test]
    async fn rename_of_unknown_session_is_a_structured_failure() -> ChatResult<()> {
        let dir = tempfile::tempdir().map_err(crate::storage::StorageError::from)?;
        let backend = Arc::new(FakeBackend::replying("unused"));
        let service = service_with(&dir, backend, ChatConfig::default()).await?;

        assert!(!service.rename_session(7, "ghost").await?);
        Ok(())
    }

    #[tokio::test]
    async fn load_of_unknown_session_fails_fast() -> ChatResult<()> {
        let dir = tempfile::tempdir().map_err(crate::storage::StorageError::from)?;
        let backend = Arc::new(FakeBackend::replying("unused"));
        let service = service_with(&dir, backend, ChatConfig::default()).await?;

        let result = service.load_session(1).await;
        assert!(matches!(result, Err(ChatError::SessionNotFound(1))));
        Ok(())
    }

    #[tokio::test]
    async fn title_policy_derives_from_first_user_message() -> ChatResult<()> {
        let dir = tempfile::tempdir().map_err(crate::storage::StorageError::from)?;
        let backend = Arc::new(FakeBackend::replying("Reykjavik"));
        let config = ChatConfig {
            derive_titles: true,
            ..ChatConfig::default()
        };
        let service = service_with(&dir, backend, config).await?;

        service
            .send_message(None, "What is the capital of Iceland?")
            .await?;

        let sessions = service.list_sessions().await?;
        assert_eq!(sessions[0].title, "What is the capital of Iceland...");
        Ok(())
    }
}
