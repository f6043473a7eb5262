//! Completion backends.
//!
//! The conversation service talks to an LLM only through the
//! [`CompletionBackend`] trait so tests can substitute a fake.

pub mod openai;

pub use openai::{CompletionBackend, CompletionError, OpenAiClient};
