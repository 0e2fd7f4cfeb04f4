//! Conversation history core
//!
//! Bounded per-chat message logs plus the two read-only projections built on
//! them: the completion prompt and the `/history` digest.
//!
//! `ConversationManager` is the entry point collaborators hold. It is created
//! once by the application and shared through an `Arc`; tests create their own
//! instances.

pub mod formatter;
pub mod store;
pub mod summary;

pub use formatter::Formatter;
pub use store::SessionStore;
pub use summary::{preview, summarize_log};

use crate::config::ConversationConfig;
use crate::llm::Prompt;
use sdk::errors::{ConversationError, EngineError};
use sdk::types::{ChatMessage, MediaInfo, Role, SessionKey};
use std::num::NonZeroUsize;

/// Session store plus its formatter, fixed for the process lifetime
#[derive(Debug)]
pub struct ConversationManager {
    store: SessionStore,
    formatter: Formatter,
}

impl ConversationManager {
    pub fn new(max_history_pairs: NonZeroUsize, system_prompt: impl Into<String>) -> Self {
        Self {
            store: SessionStore::new(max_history_pairs),
            formatter: Formatter::new(system_prompt),
        }
    }

    /// Build from the `[conversation]` config section
    ///
    /// # Errors
    ///
    /// `EngineError::Config` if `max_history_pairs` is zero.
    pub fn from_config(config: &ConversationConfig) -> Result<Self, EngineError> {
        let pairs = NonZeroUsize::new(config.max_history_pairs).ok_or_else(|| {
            EngineError::Config("max_history_pairs must be greater than 0".to_string())
        })?;
        Ok(Self::new(pairs, config.system_prompt.clone()))
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn directive(&self) -> &str {
        self.formatter.directive()
    }

    pub fn add_message(
        &self,
        key: &SessionKey,
        role: Role,
        content: impl Into<String>,
        media: Option<MediaInfo>,
    ) -> Result<(), ConversationError> {
        self.store.add_message(key, role, content, media)
    }

    pub fn get_conversation(&self, key: &SessionKey) -> Vec<ChatMessage> {
        self.store.get_conversation(key)
    }

    pub fn clear_conversation(&self, key: &SessionKey) {
        self.store.clear_conversation(key)
    }

    pub fn format_for_completion(&self, key: &SessionKey) -> Prompt {
        self.formatter.format(&self.store, key)
    }

    pub fn summarize(&self, key: &SessionKey) -> String {
        summary::summarize(&self.store, key)
    }
}
