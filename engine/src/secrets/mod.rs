pub mod string;

pub use string::SecretString;

use regex::Regex;
use sdk::errors::EngineError;
use std::sync::OnceLock;

/// Environment variable holding the Telegram bot token
pub const TELEGRAM_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";

/// Environment variable holding the Anthropic API key
pub const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Credentials the bridge needs at runtime.
///
/// They are read from the environment (or a `.env` file loaded at startup)
/// and never written to the config file.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub telegram_token: SecretString,
    pub anthropic_api_key: SecretString,
}

/// Regex patterns for detecting common secret formats.
/// These are compiled once and reused for performance.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Patterns match:
/// - Anthropic API keys: sk-ant-...
/// - Telegram bot tokens: <digits>:<35 chars>, also inside `bot<token>` URL paths
/// - x-api-key header values echoed in errors
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"sk-ant-[a-zA-Z0-9\-_]{20,}").expect("Invalid Anthropic pattern"),
            Regex::new(r"[0-9]{6,12}:[a-zA-Z0-9\-_]{30,}").expect("Invalid Telegram pattern"),
            Regex::new(r"(?i)x-api-key:\s*[^\s]+").expect("Invalid header pattern"),
        ]
    })
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` naming the first missing variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(SecretString::new)
                .ok_or_else(|| {
                    EngineError::Config(format!("Missing required environment variable: {}", key))
                })
        };

        Ok(Self {
            telegram_token: require(TELEGRAM_TOKEN_VAR)?,
            anthropic_api_key: require(ANTHROPIC_KEY_VAR)?,
        })
    }

    /// Remove both credentials and any secret-looking token from `text`
    pub fn scrub(&self, text: &str) -> String {
        let mut result = text
            .replace(self.telegram_token.unsecure(), "[REDACTED]")
            .replace(self.anthropic_api_key.unsecure(), "[REDACTED]");
        for pattern in get_secret_patterns() {
            result = pattern.replace_all(&result, "[REDACTED]").to_string();
        }
        result
    }
}

/// Remove secret-looking tokens from `text` when no credentials are at hand
pub fn scrub(text: &str) -> String {
    let mut result = text.to_string();
    for pattern in get_secret_patterns() {
        result = pattern.replace_all(&result, "[REDACTED]").to_string();
    }
    result
}
