//! Parley Engine Library
//!
//! Telegram to Anthropic chat bridge. The conversation core lives in
//! `conversation`; everything else is transport and plumbing around it.
//! Used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Credential loading and secret scrubbing
pub mod secrets;

/// Per-chat bounded conversation history
pub mod conversation;

/// Completion provider abstraction layer
pub mod llm;

/// Upload storage and reading
pub mod files;

/// Telegram bot module
pub mod bot;

/// Upload file server
pub mod server;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
