//! Parley SDK
//!
//! Shared types and errors for the Parley bridge. The conversation core in
//! the engine and every collaborator around it speak these types.

/// Error types and handling
pub mod errors;

/// Conversation types
pub mod types;

// Re-export commonly used types
pub use errors::{BridgeErrorExt, ConversationError, EngineError};
pub use types::{ChatMessage, MediaInfo, Role, SessionKey};
