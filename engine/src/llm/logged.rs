//! Request/response logging for completion providers
//!
//! `LoggedProvider` wraps any `LLMProvider`. Every call emits tracing events
//! and, when a log path is configured, appends one JSON line per request,
//! response and error. Text fields are cut to 100 characters.

use super::{Completion, LLMError, LLMProvider, Prompt};
use crate::config::AnthropicConfig;
use crate::conversation::preview;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

const LOG_PREVIEW_CHARS: usize = 100;

/// One line of the API log
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiLogEntry {
    Request {
        timestamp: String,
        model: String,
        max_tokens: u32,
        temperature: f64,
        system_prompt: Option<String>,
        user_input: Option<String>,
    },
    Response {
        timestamp: String,
        model: String,
        id: String,
        content: String,
    },
    Error {
        timestamp: String,
        model: String,
        error: String,
    },
}

impl ApiLogEntry {
    fn request(model: &str, max_tokens: u32, temperature: f64, prompt: &Prompt) -> Self {
        ApiLogEntry::Request {
            timestamp: now(),
            model: model.to_string(),
            max_tokens,
            temperature,
            system_prompt: (!prompt.directive.is_empty())
                .then(|| preview(&prompt.directive, LOG_PREVIEW_CHARS)),
            user_input: prompt
                .last_user_turn()
                .map(|m| preview(&m.content, LOG_PREVIEW_CHARS)),
        }
    }

    fn response(completion: &Completion) -> Self {
        ApiLogEntry::Response {
            timestamp: now(),
            model: completion.model.clone(),
            id: completion.id.clone(),
            content: preview(&completion.text, LOG_PREVIEW_CHARS),
        }
    }

    fn error(model: &str, err: &LLMError) -> Self {
        ApiLogEntry::Error {
            timestamp: now(),
            model: model.to_string(),
            error: preview(&crate::secrets::scrub(&err.to_string()), 300),
        }
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Provider decorator that records every exchange
pub struct LoggedProvider<P> {
    inner: P,
    max_tokens: u32,
    temperature: f64,
    log_path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl<P: LLMProvider> LoggedProvider<P> {
    /// Wrap `inner`. With `log_path` set, entries are also appended to that
    /// file (parent directories are created on first write).
    pub fn new(inner: P, config: &AnthropicConfig, log_path: Option<PathBuf>) -> Self {
        Self {
            inner,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            log_path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    async fn record(&self, entry: &ApiLogEntry) {
        let Some(path) = &self.log_path else {
            return;
        };

        let mut line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize API log entry: {}", e);
                return;
            }
        };
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Err(e) = append_line(path, &line).await {
            warn!("Failed to write API log {:?}: {}", path, e);
        }
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

#[async_trait]
impl<P: LLMProvider> LLMProvider for LoggedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn check_health(&self) -> bool {
        self.inner.check_health().await
    }

    async fn complete(&self, prompt: &Prompt) -> super::Result<Completion> {
        let request = ApiLogEntry::request(
            self.inner.model(),
            self.max_tokens,
            self.temperature,
            prompt,
        );
        info!(
            provider = self.inner.name(),
            model = self.inner.model(),
            turns = prompt.turns.len(),
            "Sending completion request"
        );
        self.record(&request).await;

        match self.inner.complete(prompt).await {
            Ok(completion) => {
                info!(
                    provider = self.inner.name(),
                    id = %completion.id,
                    chars = completion.text.chars().count(),
                    "Received completion"
                );
                self.record(&ApiLogEntry::response(&completion)).await;
                Ok(completion)
            }
            Err(e) => {
                error!(provider = self.inner.name(), "Completion failed: {}", e);
                self.record(&ApiLogEntry::error(self.inner.model(), &e)).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    #[test]
    fn test_request_entry_previews() {
        let prompt = Prompt::new(
            "d".repeat(150),
            vec![Message::user("u".repeat(120)), Message::assistant("a")],
        );
        let entry = ApiLogEntry::request("m", 1000, 0.7, &prompt);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["type"], "REQUEST");
        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(
            json["system_prompt"].as_str().unwrap(),
            format!("{}...", "d".repeat(100))
        );
        assert_eq!(
            json["user_input"].as_str().unwrap(),
            format!("{}...", "u".repeat(100))
        );
    }

    #[test]
    fn test_response_entry() {
        let completion = Completion {
            id: "msg_1".to_string(),
            model: "m".to_string(),
            text: "short".to_string(),
        };
        let json = serde_json::to_value(ApiLogEntry::response(&completion)).unwrap();
        assert_eq!(json["type"], "RESPONSE");
        assert_eq!(json["id"], "msg_1");
        assert_eq!(json["content"], "short");
    }
}
