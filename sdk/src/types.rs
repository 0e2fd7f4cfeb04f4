//! Conversation types shared between the history core and its collaborators

use crate::errors::ConversationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque identifier of a conversation session
///
/// The transport derives it from the chat identifier; the core never looks
/// inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for SessionKey {
    fn from(chat_id: i64) -> Self {
        Self(chat_id.to_string())
    }
}

impl From<&str> for SessionKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for SessionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Author of a conversational turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ConversationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(ConversationError::InvalidArgument(format!(
                "unrecognized role '{}', expected 'user' or 'assistant'",
                other
            ))),
        }
    }
}

/// Attachment metadata carried alongside a message
///
/// No schema is enforced. Only its presence is consumed (for display), it is
/// never forwarded to the completion API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaInfo(serde_json::Value);

impl MediaInfo {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// One entry of a session's message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaInfo>,
}

impl ChatMessage {
    /// Build a message, rejecting empty or whitespace-only content
    pub fn new(
        role: Role,
        content: impl Into<String>,
        media: Option<MediaInfo>,
    ) -> Result<Self, ConversationError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ConversationError::InvalidArgument(
                "message content must not be empty".to_string(),
            ));
        }
        Ok(Self {
            role,
            content,
            media,
        })
    }

    pub fn has_media(&self) -> bool {
        self.media.is_some()
    }
}
