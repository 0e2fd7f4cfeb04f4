//! Error types and handling
//!
//! This module provides the error types used throughout the Parley bridge.
//! Engine errors implement the `BridgeErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! User hints never include:
//! - Secrets (bot tokens, API keys)
//! - Local file paths
//! - Raw upstream response bodies

use thiserror::Error;

/// Trait for bridge error extensions
///
/// Provides additional context for errors, including user-friendly hints
/// and recoverability information.
pub trait BridgeErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to send back into a chat.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried by the user. Non-recoverable errors
    /// need an operator to fix configuration or credentials.
    fn is_recoverable(&self) -> bool;
}

/// Errors raised by the conversation history core
///
/// The core has a single failure mode: a caller handed it a message that
/// does not satisfy the message model. Lookups of unknown sessions are not
/// errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration and environment
/// - **LLM Provider**: Completion API failures
/// - **Telegram**: Bot API failures
/// - **Files**: Upload download and reading errors
/// - **Conversation**: Rejected history mutations
///
/// # Examples
///
/// ```
/// use sdk::errors::{BridgeErrorExt, EngineError};
///
/// let error = EngineError::FileTooLarge { size_mb: 12.5, limit_mb: 10 };
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::Config("Missing TELEGRAM_BOT_TOKEN".to_string());
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    // Telegram errors
    #[error("Telegram API error: {0}")]
    Telegram(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // File errors
    #[error("File is too large ({size_mb:.2}MB). Maximum size is {limit_mb}MB.")]
    FileTooLarge { size_mb: f64, limit_mb: u64 },

    #[error("No file to analyze")]
    NoUpload,

    // Conversation errors
    #[error(transparent)]
    Conversation(#[from] ConversationError),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file and environment variables",
            Self::LLMProvider(_) => "The language model is unavailable. Please try again later",
            Self::Telegram(_) => "Telegram could not process the request. Please try again",
            Self::Network(_) => "Network error. Please check your connection and try again",
            Self::FileTooLarge { .. } => "File is too large. Maximum size is 10MB",
            Self::NoUpload => "Please upload a file first",
            Self::Conversation(_) => "The message could not be added to the conversation",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}
