//! CLI interface for Parley
//!
//! Defines the commands and global flags of the `parley` binary using clap's
//! derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parley: Telegram to Anthropic chat bridge
///
/// Relays Telegram chats to an Anthropic model, keeping a bounded history per
/// chat and serving uploaded files over HTTP.
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the bot and the upload file server
    Run,

    /// Validate configuration and credentials without starting
    Check,
}
