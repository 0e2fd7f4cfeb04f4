//! LLM Provider Abstraction Layer
//!
//! This module provides the interface the transport uses to talk to a hosted
//! completion API. The `LLMProvider` trait defines the contract, `Prompt` is
//! the provider-neutral request shape produced by the conversation formatter,
//! and `LoggedProvider` decorates any provider with request/response logging.

use async_trait::async_trait;
use sdk::types::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod anthropic;
pub mod logged;

pub use anthropic::AnthropicProvider;
pub use logged::LoggedProvider;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Service unavailable ({status}): {body}")]
    ServiceUnavailable { status: u16, body: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Response contained no text")]
    EmptyResponse,

    #[error("Unknown error ({status}): {body}")]
    Unknown { status: u16, body: String },
}

impl LLMError {
    /// Map an HTTP status and body returned by a provider to an error
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => LLMError::InvalidRequest(body),
            401 => LLMError::AuthenticationFailed(body),
            403 => LLMError::AccessDenied(body),
            429 => LLMError::RateLimitExceeded,
            500..=599 => LLMError::ServiceUnavailable { status, body },
            _ => LLMError::Unknown { status, body },
        }
    }

    /// Sentence shown to the chat user when a completion fails
    pub fn user_message(&self) -> &'static str {
        match self {
            LLMError::AuthenticationFailed(_) => "Authentication error. Please check the API key.",
            LLMError::AccessDenied(_) => {
                "Access denied. Your API key may not have permission to use this model or the model ID is incorrect."
            }
            LLMError::RateLimitExceeded => {
                "Rate limit exceeded. Please try again in a few moments."
            }
            LLMError::ServiceUnavailable { .. } => {
                "Service is temporarily unavailable. Please try again later."
            }
            LLMError::InvalidRequest(_) => {
                "Invalid request. The bot encountered an error with your message."
            }
            LLMError::NetworkError(_) | LLMError::Timeout => {
                "Network error. Please check your connection and try again."
            }
            LLMError::ParseError(_) | LLMError::EmptyResponse | LLMError::Unknown { .. } => {
                "Sorry, I encountered an error. Please try again later."
            }
        }
    }
}

impl From<reqwest::Error> for LLMError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LLMError::Timeout
        } else if e.is_decode() {
            LLMError::ParseError(e.to_string())
        } else {
            LLMError::NetworkError(e.to_string())
        }
    }
}

/// Role of a message in a completion request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Directive message, only present in the inline shape
    System,

    /// User message
    User,

    /// Assistant message
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

/// A `{role, content}` pair as sent to a completion API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Provider-neutral completion request
///
/// The directive is kept apart from the conversational turns. Providers that
/// take the directive as a top-level parameter read `directive` directly,
/// providers that expect it inline use `to_messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub directive: String,
    pub turns: Vec<Message>,
}

impl Prompt {
    pub fn new(directive: impl Into<String>, turns: Vec<Message>) -> Self {
        Self {
            directive: directive.into(),
            turns,
        }
    }

    /// Inline shape: a leading system message followed by every turn
    pub fn to_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        messages.push(Message::system(self.directive.clone()));
        messages.extend(self.turns.iter().cloned());
        messages
    }

    /// Split an inline sequence back into directive and turns
    ///
    /// Multiple system messages are joined with a newline.
    pub fn from_messages(messages: &[Message]) -> Self {
        let mut directive_parts = Vec::new();
        let mut turns = Vec::new();
        for msg in messages {
            if msg.role == MessageRole::System {
                directive_parts.push(msg.content.as_str());
            } else {
                turns.push(msg.clone());
            }
        }
        Self {
            directive: directive_parts.join("\n"),
            turns,
        }
    }

    /// The most recent user turn, if any
    pub fn last_user_turn(&self) -> Option<&Message> {
        self.turns
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
    }
}

/// Text generated by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Provider-assigned response id
    pub id: String,

    /// Model that produced the response
    pub model: String,

    /// Concatenated text content
    pub text: String,
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g. "anthropic")
    fn name(&self) -> &str;

    /// Model identifier requests are sent with
    fn model(&self) -> &str;

    /// Generate a completion for the prompt
    async fn complete(&self, prompt: &Prompt) -> Result<Completion>;

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}
