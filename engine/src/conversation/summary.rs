//! Summarizer
//!
//! Renders the tail of a session log as a short numbered digest for the
//! `/history` command.

use super::store::SessionStore;
use sdk::types::{ChatMessage, Role, SessionKey};

/// Number of trailing messages shown in a digest (five exchanges)
pub const SUMMARY_WINDOW: usize = 10;

/// Characters of content shown per entry before truncation
pub const PREVIEW_CHARS: usize = 100;

/// Appended to truncated text
pub const ELLIPSIS: &str = "...";

/// Returned when a session has no messages
pub const EMPTY_SUMMARY: &str = "No conversation history yet.";

const HEADER: &str = "Conversation History:";
const USER_LABEL: &str = "🧑 You";
const ASSISTANT_LABEL: &str = "🤖 Claude";
const MEDIA_MARKER: &str = " [Media]";

/// Cut `text` to its first `limit` characters, marking the cut with `...`
///
/// Counts Unicode scalar values, never splits a character.
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Digest of the session's recent messages. Never creates the session.
pub fn summarize(store: &SessionStore, key: &SessionKey) -> String {
    store.read(key, summarize_log)
}

/// Digest of an explicit log
///
/// Entries are numbered by their position in the whole log, so a 12-message
/// log renders entries 3 through 12.
pub fn summarize_log(log: &[ChatMessage]) -> String {
    if log.is_empty() {
        return EMPTY_SUMMARY.to_string();
    }

    let start = log.len().saturating_sub(SUMMARY_WINDOW);
    let mut summary = String::from(HEADER);
    for (offset, message) in log[start..].iter().enumerate() {
        summary.push_str("\n\n");
        summary.push_str(&render_entry(start + offset + 1, message));
    }
    summary
}

fn render_entry(index: usize, message: &ChatMessage) -> String {
    let label = match message.role {
        Role::User => USER_LABEL,
        Role::Assistant => ASSISTANT_LABEL,
    };
    let marker = if message.has_media() { MEDIA_MARKER } else { "" };
    format!(
        "{}. {}{}: {}",
        index,
        label,
        marker,
        preview(&message.content, PREVIEW_CHARS)
    )
}
