//! Conversation service module.
//!
//! Bridges the UI-facing API and the storage engine: session lifecycle,
//! message persistence, and conversation assembly for the completion call.

pub mod errors;
pub mod service;
pub mod types;

pub use errors::{ChatError, ChatResult};
pub use service::{ChatService, SendOutcome};
pub use types::{ChatMessage, MessageRole, SessionMeta};
