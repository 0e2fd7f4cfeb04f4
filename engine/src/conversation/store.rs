//! Session Store
//!
//! Per-chat, size-bounded message logs. Every mutation of history goes through
//! this type.
//!
//! # Concurrency
//!
//! Sessions live in a sharded concurrent map. Each operation holds the lock of
//! the shard owning its key for the whole read-modify-write, so two appends
//! on the same session serialize and the trim always sees the current length.
//! Sessions on other shards are never blocked, and no lock outlives a call.

use dashmap::DashMap;
use sdk::errors::ConversationError;
use sdk::types::{ChatMessage, MediaInfo, Role, SessionKey};
use std::num::NonZeroUsize;

/// In-memory table of conversation sessions
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<SessionKey, Vec<ChatMessage>>,
    max_history_pairs: NonZeroUsize,
}

impl SessionStore {
    /// Create an empty store keeping at most `2 * max_history_pairs` messages
    /// per session
    pub fn new(max_history_pairs: NonZeroUsize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_history_pairs,
        }
    }

    pub fn max_history_pairs(&self) -> usize {
        self.max_history_pairs.get()
    }

    /// Maximum number of messages retained per session
    pub fn capacity(&self) -> usize {
        self.max_history_pairs.get().saturating_mul(2)
    }

    /// Append a message, creating the session if absent
    ///
    /// When the log grows past `capacity()`, the oldest messages are dropped
    /// so that exactly `capacity()` remain.
    ///
    /// # Errors
    ///
    /// `ConversationError::InvalidArgument` if `content` is empty. Nothing is
    /// recorded and no session is created in that case.
    pub fn add_message(
        &self,
        key: &SessionKey,
        role: Role,
        content: impl Into<String>,
        media: Option<MediaInfo>,
    ) -> Result<(), ConversationError> {
        let message = ChatMessage::new(role, content, media)?;
        let capacity = self.capacity();

        let mut log = self.sessions.entry(key.clone()).or_default();
        log.push(message);
        if log.len() > capacity {
            let excess = log.len() - capacity;
            log.drain(..excess);
            tracing::trace!(session = %key, dropped = excess, "Trimmed conversation history");
        }
        Ok(())
    }

    /// Append a message whose role arrives as a string
    ///
    /// # Errors
    ///
    /// `ConversationError::InvalidArgument` for a role other than `user` or
    /// `assistant`, or empty content.
    pub fn add_message_str(
        &self,
        key: &SessionKey,
        role: &str,
        content: impl Into<String>,
        media: Option<MediaInfo>,
    ) -> Result<(), ConversationError> {
        let role: Role = role.parse()?;
        self.add_message(key, role, content, media)
    }

    /// Snapshot of the session's log, creating an empty session if the key is
    /// new
    pub fn get_conversation(&self, key: &SessionKey) -> Vec<ChatMessage> {
        self.sessions.entry(key.clone()).or_default().clone()
    }

    /// Remove the session entirely. Clearing an unknown key is a no-op.
    pub fn clear_conversation(&self, key: &SessionKey) {
        if self.sessions.remove(key).is_some() {
            tracing::debug!(session = %key, "Cleared conversation history");
        }
    }

    /// Run `f` over the session's log without creating the session
    ///
    /// An unknown key is observed as an empty log.
    pub fn read<R>(&self, key: &SessionKey, f: impl FnOnce(&[ChatMessage]) -> R) -> R {
        match self.sessions.get(key) {
            Some(log) => f(log.as_slice()),
            None => f(&[]),
        }
    }

    /// Number of messages in the session, zero if absent
    pub fn len(&self, key: &SessionKey) -> usize {
        self.read(key, |log| log.len())
    }

    /// Whether the session is absent or holds no messages
    pub fn is_empty(&self, key: &SessionKey) -> bool {
        self.len(key) == 0
    }

    /// Whether a session exists for the key
    pub fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.contains_key(key)
    }

    /// Number of sessions currently held
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(pairs: usize) -> SessionStore {
        SessionStore::new(NonZeroUsize::new(pairs).unwrap())
    }

    fn contents(log: &[ChatMessage]) -> Vec<&str> {
        log.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_add_creates_session() {
        let store = store(2);
        let key = SessionKey::from(1);
        assert!(!store.contains(&key));

        store.add_message(&key, Role::User, "hi", None).unwrap();
        assert!(store.contains(&key));
        assert_eq!(store.len(&key), 1);
    }

    #[test]
    fn test_insertion_order() {
        let store = store(5);
        let key = SessionKey::from(1);
        store.add_message(&key, Role::User, "a", None).unwrap();
        store.add_message(&key, Role::Assistant, "b", None).unwrap();
        store.add_message(&key, Role::User, "c", None).unwrap();

        let log = store.get_conversation(&key);
        assert_eq!(contents(&log), vec!["a", "b", "c"]);
        assert_eq!(log[1].role, Role::Assistant);
    }

    #[test]
    fn test_trim_drops_oldest() {
        let store = store(2);
        let key = SessionKey::from(1);
        for i in 0..4 {
            store
                .add_message(&key, Role::User, format!("m{}", i), None)
                .unwrap();
        }
        assert_eq!(store.len(&key), 4);

        store.add_message(&key, Role::Assistant, "m4", None).unwrap();
        let log = store.get_conversation(&key);
        assert_eq!(contents(&log), vec!["m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn test_invalid_content_rejected_without_creating_session() {
        let store = store(2);
        let key = SessionKey::from(1);
        let err = store.add_message(&key, Role::User, "", None).unwrap_err();
        assert!(matches!(err, ConversationError::InvalidArgument(_)));
        assert!(!store.contains(&key));
    }

    #[test]
    fn test_invalid_role_string_rejected() {
        let store = store(2);
        let key = SessionKey::from(1);
        assert!(store.add_message_str(&key, "system", "x", None).is_err());
        assert!(store.add_message_str(&key, "assistant", "x", None).is_ok());
        assert_eq!(store.len(&key), 1);
    }

    #[test]
    fn test_get_creates_empty_session() {
        let store = store(2);
        let key = SessionKey::from("new");
        assert!(store.get_conversation(&key).is_empty());
        assert!(store.contains(&key));
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn test_read_does_not_create_session() {
        let store = store(2);
        let key = SessionKey::from("ghost");
        assert_eq!(store.read(&key, |log| log.len()), 0);
        assert!(store.is_empty(&key));
        assert!(!store.contains(&key));
    }

    #[test]
    fn test_clear_removes_session() {
        let store = store(2);
        let key = SessionKey::from(1);
        store.add_message(&key, Role::User, "hi", None).unwrap();
        store.clear_conversation(&key);
        assert!(!store.contains(&key));
        assert_eq!(store.session_count(), 0);

        store.clear_conversation(&key);
        store.clear_conversation(&SessionKey::from("never-used"));
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn test_media_is_kept_in_log() {
        let store = store(2);
        let key = SessionKey::from(1);
        let media = MediaInfo::new(json!({"kind": "document", "file_name": "a.txt"}));
        store
            .add_message(&key, Role::User, "file", Some(media.clone()))
            .unwrap();
        let log = store.get_conversation(&key);
        assert_eq!(log[0].media.as_ref(), Some(&media));
    }

    #[test]
    fn test_sessions_are_independent() {
        let store = store(1);
        let a = SessionKey::from(1);
        let b = SessionKey::from(2);
        for i in 0..5 {
            store
                .add_message(&a, Role::User, format!("a{}", i), None)
                .unwrap();
        }
        store.add_message(&b, Role::User, "b0", None).unwrap();

        assert_eq!(contents(&store.get_conversation(&a)), vec!["a3", "a4"]);
        assert_eq!(contents(&store.get_conversation(&b)), vec!["b0"]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = store(2);
        let key = SessionKey::from(1);
        store.add_message(&key, Role::User, "hi", None).unwrap();
        let mut snapshot = store.get_conversation(&key);
        snapshot.clear();
        assert_eq!(store.len(&key), 1);
    }
}
