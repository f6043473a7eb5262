//! Application state shared across all request handlers.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::chat::ChatService;

/// Shared application state.
///
/// Holds the conversation service plus the single "current session" pointer
/// for the one human driving the window. The pointer is process-local state,
/// never persisted, and guarded by a lock in case several UI surfaces call in
/// at once.
pub struct AppState {
    /// Conversation service.
    pub service: ChatService,
    /// Currently active session identifier, if any.
    active_session: RwLock<Option<i64>>,
}

impl AppState {
    /// Create the shared state around a service.
    #[must_use]
    pub fn new(service: ChatService) -> Arc<Self> {
        Arc::new(Self {
            service,
            active_session: RwLock::new(None),
        })
    }

    /// Get the active session identifier.
    pub async fn active_session(&self) -> Option<i64> {
        *self.active_session.read().await
    }

    /// Make a session the active one.
    pub async fn set_active_session(&self, session_id: i64) {
        let mut guard = self.active_session.write().await;
        *guard = Some(session_id);
    }

    /// Clear the active pointer if it currently refers to `session_id`.
    /// Deleting a different session leaves the pointer untouched.
    pub async fn clear_if_active(&self, session_id: i64) {
        let mut guard = self.active_session.write().await;
        if *guard == Some(session_id) {
            *guard = None;
        }
    }
}
