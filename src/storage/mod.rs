//! Storage engine for chat sessions and messages.
//!
//! One `SQLite` file, WAL journal mode, schema-level cascade delete. All
//! access goes through [`ChatStore`], so the service layer never touches a
//! connection directly.

pub mod chat_store;
pub mod errors;

pub use chat_store::{ChatStore, SqliteChatStore, StoreFuture};
pub use errors::{StorageError, StorageResult};
