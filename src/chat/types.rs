//! Domain types shared by the storage engine, the service, and the API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a chat message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

impl MessageRole {
    /// Stable string form for storage and the completion wire format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(value.to_string()),
        }
    }
}

/// One immutable turn in a conversation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the author.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
    /// Creation timestamp in milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// Session metadata displayed in the sidebar.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Auto-incrementing session identifier.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// Creation timestamp in milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Last-updated timestamp in milliseconds since the Unix epoch.
    pub updated_at: i64,
    /// Number of messages, derived with a correlated count (never stored).
    pub message_count: u32,
}
