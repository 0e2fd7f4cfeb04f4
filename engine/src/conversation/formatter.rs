//! Message Formatter
//!
//! Projects a session log into the request shape of the completion API.

use super::store::SessionStore;
use crate::llm::{Message, Prompt};
use sdk::types::{ChatMessage, SessionKey};

/// Builds completion prompts from session logs under a fixed directive
#[derive(Debug, Clone)]
pub struct Formatter {
    directive: String,
}

impl Formatter {
    pub fn new(directive: impl Into<String>) -> Self {
        Self {
            directive: directive.into(),
        }
    }

    pub fn directive(&self) -> &str {
        &self.directive
    }

    /// Prompt for the session's current log
    ///
    /// Read-only: an unknown session yields a prompt with no turns and is not
    /// created.
    pub fn format(&self, store: &SessionStore, key: &SessionKey) -> Prompt {
        store.read(key, |log| self.format_log(log))
    }

    /// Prompt for an explicit log. Media metadata is dropped.
    pub fn format_log(&self, log: &[ChatMessage]) -> Prompt {
        let turns = log
            .iter()
            .map(|msg| Message {
                role: msg.role.into(),
                content: msg.content.clone(),
            })
            .collect();
        Prompt::new(self.directive.clone(), turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;
    use sdk::types::{MediaInfo, Role};
    use serde_json::json;
    use std::num::NonZeroUsize;

    #[test]
    fn test_format_fidelity() {
        let store = SessionStore::new(NonZeroUsize::new(10).unwrap());
        let key = SessionKey::from(7);
        let media = MediaInfo::new(json!({"kind": "photo"}));
        store.add_message(&key, Role::User, "hi", Some(media)).unwrap();
        store
            .add_message(&key, Role::Assistant, "hello", None)
            .unwrap();

        let prompt = Formatter::new("D").format(&store, &key);
        assert_eq!(prompt.directive, "D");
        assert_eq!(
            prompt.turns,
            vec![Message::user("hi"), Message::assistant("hello")]
        );

        let json = serde_json::to_string(&prompt).unwrap();
        assert!(!json.contains("photo"));
    }

    #[test]
    fn test_format_unknown_session() {
        let store = SessionStore::new(NonZeroUsize::new(10).unwrap());
        let key = SessionKey::from("nobody");
        let prompt = Formatter::new("D").format(&store, &key);
        assert!(prompt.turns.is_empty());
        assert!(!store.contains(&key));
    }

    #[test]
    fn test_format_does_not_mutate() {
        let store = SessionStore::new(NonZeroUsize::new(10).unwrap());
        let key = SessionKey::from(7);
        store.add_message(&key, Role::User, "hi", None).unwrap();
        let formatter = Formatter::new("D");
        let _ = formatter.format(&store, &key);
        let _ = formatter.format(&store, &key);
        assert_eq!(store.len(&key), 1);
    }

    #[test]
    fn test_inline_directive_leads() {
        let log = vec![ChatMessage::new(Role::User, "q", None).unwrap()];
        let inline = Formatter::new("Be brief").format_log(&log).to_messages();
        assert_eq!(inline[0].role, MessageRole::System);
        assert_eq!(inline[0].content, "Be brief");
        assert_eq!(inline[1].role, MessageRole::User);
    }
}
