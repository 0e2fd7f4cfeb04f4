//! Telegram transport
//!
//! `api` speaks the Bot API over HTTP; `telegram` maps inbound messages onto
//! the conversation core and the completion provider.

pub mod api;
pub mod telegram;

pub use api::TelegramApi;
pub use telegram::{Command, Inbound, TelegramBot};
