//! Error types for the conversation service.

use thiserror::Error;

use crate::llm::CompletionError;
use crate::storage::StorageError;

/// Conversation service error type.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Storage-level failure; fatal to the operation, never the process.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    /// The referenced session does not exist.
    #[error("session {0} not found")]
    SessionNotFound(i64),
    /// The external completion call failed. The user message for
    /// `session_id` was already persisted; no assistant message was written.
    #[error("completion failed for session {session_id}: {source}")]
    CompletionFailed {
        /// Session the failed exchange belongs to.
        session_id: i64,
        /// Underlying completion failure.
        source: CompletionError,
    },
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience result alias for conversation operations.
pub type ChatResult<T> = Result<T, ChatError>;
