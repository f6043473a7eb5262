//! Async client for the `OpenAI` chat-completions endpoint.
//!
//! The request carries the full ordered conversation history; the reply is a
//! single generated message. No streaming, no retries. A bounded request
//! timeout guards the one operation with meaningful latency.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::types::ChatMessage;
use crate::config::LlmConfig;

/// Connect timeout for the completion endpoint.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors produced by a completion backend.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// No API credential was configured. Surfaced lazily, on first use.
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    /// Transport-level failure, including the request timeout.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status.
    #[error("completion api returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },
    /// The response body did not contain a usable reply.
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

/// Backend that turns ordered conversation history into a reply.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Generate a reply for the given history, oldest message first.
    ///
    /// # Errors
    /// Returns an error if the completion call fails in any way.
    async fn complete(&self, history: &[ChatMessage]) -> Result<String, CompletionError>;
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Pull the reply text out of a parsed completion response.
fn extract_reply(response: ChatCompletionResponse) -> Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| CompletionError::MalformedResponse("no choices in response".to_string()))
}

/// `OpenAI` chat-completions client.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiClient {
    /// Build a client from the LLM configuration.
    ///
    /// A missing API key is not an error here; it surfaces on the first
    /// completion attempt.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, history: &[ChatMessage]) -> Result<String, CompletionError> {
        let api_key = self.api_key.as_deref().ok_or(CompletionError::MissingApiKey)?;

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: history
                .iter()
                .map(|message| WireMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|parsed| parsed.error)
                .map_or(body, |detail| detail.message);
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        extract_reply(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_is_extracted_and_trimmed() -> Result<(), CompletionError> {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Hello there. \n"}}]}"#;
        let parsed: ChatCompletionResponse =
            serde_json::from_str(body).map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;
        assert_eq!(extract_reply(parsed)?, "Hello there.");
        Ok(())
    }

    #[test]
    fn empty_choices_are_malformed() -> Result<(), serde_json::Error> {
        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#)?;
        assert!(matches!(
            extract_reply(parsed),
            Err(CompletionError::MalformedResponse(_))
        ));
        Ok(())
    }

    #[test]
    fn error_detail_is_preferred_over_raw_body() -> Result<(), serde_json::Error> {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        let parsed: ApiErrorBody = serde_json::from_str(body)?;
        let message = parsed.error.map(|detail| detail.message);
        assert_eq!(message.as_deref(), Some("Incorrect API key provided"));
        Ok(())
    }
}
