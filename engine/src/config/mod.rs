//! Configuration management
//!
//! This module handles loading, validation, and management of the Parley
//! configuration. Configuration is stored in TOML format at
//! ~/.parley/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **telegram**: Bot API endpoint and polling settings
//! - **anthropic**: Completion API endpoint, model and sampling settings
//! - **server**: Public URL, port and uploads directory of the file server
//! - **conversation**: History bound and system prompt
//!
//! Secrets (bot token, API key) never live in this file; see
//! [`crate::secrets::Credentials`].
//!
//! # Environment Overrides
//!
//! After the file is parsed, these variables (also read from a `.env` file)
//! take precedence:
//!
//! - `ANTHROPIC_MODEL` → `anthropic.model`
//! - `SERVER_URL` → `server.public_url`
//! - `PORT` → `server.port`
//!
//! # Examples
//!
//! ```no_run
//! use parley_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Model: {}", config.anthropic.model);
//! println!("History pairs: {}", config.conversation.max_history_pairs);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Telegram Bot API settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Anthropic API settings
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Upload file server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Conversation history settings
    #[serde(default)]
    pub conversation: ConversationConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Base URL of the Bot API
    #[serde(default = "default_telegram_api_base_url")]
    pub api_base_url: String,

    /// Long-polling timeout passed to getUpdates (seconds)
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Pause between two getUpdates calls (milliseconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

/// Anthropic provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Base URL for Anthropic API
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_anthropic_model")]
    pub model: String,

    /// Maximum tokens generated per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Append request/response records to <data_dir>/logs/anthropic_api.log
    #[serde(default = "default_true")]
    pub api_log: bool,
    // Note: API key comes from the environment, not from config
}

/// Upload file server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Public URL uploads are linked under
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Listening port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory downloaded files are stored in (supports ~ expansion)
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
}

/// Conversation history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Number of user/assistant pairs kept per chat
    #[serde(default = "default_max_history_pairs")]
    pub max_history_pairs: usize,

    /// Directive sent with every completion request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.parley")
}

fn default_telegram_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    300
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f64 {
    0.7
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("~/.parley/uploads")
}

fn default_max_history_pairs() -> usize {
    10
}

fn default_system_prompt() -> String {
    "You are Claude, an AI assistant by Anthropic, helping via a Telegram bot. \
     Be helpful, harmless, and honest. Keep responses concise and to the point, \
     suitable for a messaging platform."
        .to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_telegram_api_base_url(),
            poll_timeout_secs: default_poll_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_log: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            public_url: default_public_url(),
            port: default_port(),
            uploads_dir: default_uploads_dir(),
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_history_pairs: default_max_history_pairs(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.parley/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default
    /// configuration. Environment overrides are applied before validation.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - An environment override is malformed
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate_and_process()?;

        Ok(config)
    }

    /// Parse TOML without validating
    pub fn parse(contents: &str) -> Result<Self, EngineError> {
        toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Create default configuration and save it to `path`
    ///
    /// The file is written before environment overrides are applied, so
    /// values coming from the environment are never persisted.
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate_and_process()?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.parley/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".parley").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            telegram: TelegramConfig::default(),
            anthropic: AnthropicConfig::default(),
            server: ServerConfig::default(),
            conversation: ConversationConfig::default(),
        }
    }

    /// Apply environment overrides read through `lookup`
    ///
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if `PORT` is not a valid port number.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = get("ANTHROPIC_MODEL") {
            self.anthropic.model = model;
        }
        if let Some(url) = get("SERVER_URL") {
            self.server.public_url = url;
        }
        if let Some(port) = get("PORT") {
            self.server.port = port.trim().parse().map_err(|_| {
                EngineError::Config(format!("Invalid PORT '{}': expected 1-65535", port))
            })?;
        }
        Ok(())
    }

    /// Path of the completion API log file
    pub fn api_log_path(&self) -> PathBuf {
        self.core.data_dir.join("logs").join("anthropic_api.log")
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates field ranges
    /// - Expands ~ in paths
    /// - Creates the data and uploads directories
    ///
    /// # Errors
    ///
    /// Returns an error if a field is out of range or a directory cannot be
    /// created.
    pub fn validate_and_process(&mut self) -> Result<(), EngineError> {
        self.validate()?;

        self.core.data_dir = expand_path(&self.core.data_dir)?;
        self.server.uploads_dir = expand_path(&self.server.uploads_dir)?;

        for dir in [&self.core.data_dir, &self.server.uploads_dir] {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| {
                    EngineError::Config(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }

    /// Check field values without touching the filesystem
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.conversation.max_history_pairs == 0 {
            return Err(EngineError::Config(
                "max_history_pairs must be greater than 0".to_string(),
            ));
        }
        if self.conversation.system_prompt.trim().is_empty() {
            return Err(EngineError::Config(
                "system_prompt must not be empty".to_string(),
            ));
        }

        if self.anthropic.model.trim().is_empty() {
            return Err(EngineError::Config(
                "anthropic.model must not be empty".to_string(),
            ));
        }
        if self.anthropic.max_tokens == 0 {
            return Err(EngineError::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.anthropic.temperature) {
            return Err(EngineError::Config(
                "temperature must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(EngineError::Config("port must not be 0".to_string()));
        }
        if self.telegram.poll_timeout_secs == 0 {
            return Err(EngineError::Config(
                "poll_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
