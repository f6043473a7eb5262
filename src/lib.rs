//! FireflyChat: a local-first desktop chat client backend.
//!
//! Persists chat sessions and messages in `SQLite`, assembles ordered
//! conversation history, and forwards it to an OpenAI-compatible completion
//! endpoint. A small HTTP API plus static file serving backs the window shell.

// Strict lint policy shared across the codebase.
#![deny(unsafe_code)] // No unsafe anywhere
#![deny(missing_docs)] // Every public item is documented
#![deny(non_camel_case_types)]
#![deny(unused_must_use)] // Result and Option must be handled explicitly
#![deny(non_snake_case)]
#![deny(non_upper_case_globals)]
#![deny(nonstandard_style)]
#![forbid(unsafe_op_in_unsafe_fn)]
// Clippy discipline
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)] // Propagate with `?`, never unwrap()
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::print_stdout)] // tracing only, no println!()
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::redundant_clone)]

/// Conversation service: session lifecycle and message exchange.
pub mod chat;
/// Runtime configuration sourced from the process environment.
pub mod config;
/// Completion backends (`OpenAI` chat completions).
pub mod llm;
/// HTTP server and API routes consumed by the window shell.
pub mod server;
/// Bootstrap helpers for the `firefly` binary.
pub mod start_firefly;
/// `SQLite` persistence for sessions and messages.
pub mod storage;
