//! Runtime configuration for the FireflyChat backend.
//!
//! Everything is sourced from the process environment with sensible defaults;
//! nothing here performs network access. The API credential is validated
//! lazily, when a completion is first attempted.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::chat::errors::{ChatError, ChatResult};

/// Default database file location, relative to the working directory.
const DEFAULT_DB_PATH: &str = "data/chats.db";
/// Default completion model.
const DEFAULT_MODEL: &str = "gpt-4o";
/// Default completion endpoint.
const DEFAULT_BASE_URL: &str = "https://api.openai.com";
/// Default output token budget.
const DEFAULT_MAX_TOKENS: u32 = 1_200;
/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default completion request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
/// Default title placeholder for new sessions.
const DEFAULT_SESSION_TITLE: &str = "New Chat";
/// Default truncation length for derived titles.
const DEFAULT_TITLE_MAX_LEN: usize = 30;

/// Top-level application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database file location.
    pub db_path: PathBuf,
    /// Port the local API server binds to.
    pub port: u16,
    /// Completion endpoint settings.
    pub llm: LlmConfig,
    /// Conversation service settings.
    pub chat: ChatConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            port: crate::server::DEFAULT_PORT,
            llm: LlmConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            db_path: std::env::var("FIREFLY_DB_PATH")
                .map_or(defaults.db_path, PathBuf::from),
            port: std::env::var("FIREFLY_PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.port),
            llm: LlmConfig::from_env(),
            chat: ChatConfig::from_env(),
        }
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        if self.llm.max_tokens == 0 {
            return Err(ChatError::InvalidConfig(
                "llm.max_tokens must be > 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ChatError::InvalidConfig(
                "llm.temperature must be within [0.0, 2.0]".to_string(),
            ));
        }
        if self.llm.request_timeout_secs == 0 {
            return Err(ChatError::InvalidConfig(
                "llm.request_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.chat.title_max_len == 0 {
            return Err(ChatError::InvalidConfig(
                "chat.title_max_len must be > 0".to_string(),
            ));
        }
        if self.chat.default_title.is_empty() {
            return Err(ChatError::InvalidConfig(
                "chat.default_title must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Completion endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API credential. `None` until the environment provides one.
    pub api_key: Option<String>,
    /// Endpoint base URL, without a trailing `/v1`.
    pub base_url: String,
    /// Model identifier sent with every completion.
    pub model: String,
    /// Maximum output tokens per completion.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl LlmConfig {
    /// Build the LLM settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("FIREFLY_MODEL").unwrap_or(defaults.model),
            max_tokens: std::env::var("FIREFLY_MAX_TOKENS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.max_tokens),
            temperature: std::env::var("FIREFLY_TEMPERATURE")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.temperature),
            request_timeout_secs: defaults.request_timeout_secs,
        }
    }
}

/// Conversation service settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Title given to sessions at creation.
    pub default_title: String,
    /// Derive the session title from the first user message. Off unless
    /// explicitly requested; the behavior is a policy, not a default.
    pub derive_titles: bool,
    /// Maximum length of a derived title before truncation.
    pub title_max_len: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_title: DEFAULT_SESSION_TITLE.to_string(),
            derive_titles: false,
            title_max_len: DEFAULT_TITLE_MAX_LEN,
        }
    }
}

impl ChatConfig {
    /// Build the chat settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            derive_titles: std::env::var("FIREFLY_DERIVE_TITLES")
                .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.derive_titles),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() -> ChatResult<()> {
        AppConfig::default().validate()
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let config = AppConfig {
            llm: LlmConfig {
                temperature: 3.5,
                ..LlmConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ChatError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_token_budget_is_rejected() {
        let config = AppConfig {
            llm: LlmConfig {
                max_tokens: 0,
                ..LlmConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ChatError::InvalidConfig(_))
        ));
    }
}
