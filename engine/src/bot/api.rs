//! Minimal Telegram Bot API client
//!
//! Only the calls the bridge needs: long polling, sending text with a reply
//! keyboard, chat actions and file download.

use crate::secrets::SecretString;
use reqwest::Client;
use sdk::errors::EngineError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Deserialize, Debug, Clone)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo: Option<Vec<PhotoSize>>,
    pub document: Option<Document>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Chat {
    pub id: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct User {
    pub id: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    pub file_size: Option<u64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

/// Result of getFile
#[derive(Deserialize, Debug, Clone)]
pub struct File {
    pub file_id: String,
    pub file_path: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct KeyboardButton {
    pub text: String,
}

/// Persistent reply keyboard shown under the input field
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
    pub one_time_keyboard: bool,
}

impl ReplyKeyboardMarkup {
    fn row(labels: &[&str]) -> Self {
        Self {
            keyboard: vec![labels
                .iter()
                .map(|l| KeyboardButton {
                    text: l.to_string(),
                })
                .collect()],
            resize_keyboard: true,
            one_time_keyboard: false,
        }
    }

    /// `/clear /history /help`
    pub fn commands() -> Self {
        Self::row(&["/clear", "/history", "/help"])
    }

    /// `/analyze /clear /help`, shown after a document upload
    pub fn analyze() -> Self {
        Self::row(&["/analyze", "/clear", "/help"])
    }
}

#[derive(Clone)]
pub struct TelegramApi {
    base_url: String,
    token: SecretString,
    client: Client,
}

impl std::fmt::Debug for TelegramApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramApi")
            .field("base_url", &self.base_url)
            .field("token", &self.token)
            .finish()
    }
}

impl TelegramApi {
    /// `poll_timeout_secs` is the long-polling timeout; the HTTP timeout is
    /// set comfortably above it.
    pub fn new(base_url: impl Into<String>, token: SecretString, poll_timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            client: Client::builder()
                .timeout(Duration::from_secs(poll_timeout_secs + 50))
                .build()
                .unwrap_or_default(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token.unsecure(), method)
    }

    /// Download URL of a file returned by getFile
    pub fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.base_url,
            self.token.unsecure(),
            file_path
        )
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, EngineError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Network(crate::secrets::scrub(&e.to_string())))?
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| EngineError::Telegram(format!("{} returned invalid JSON: {}", method, e)))?;

        if !response.ok {
            return Err(EngineError::Telegram(format!(
                "{} failed: {}",
                method,
                response.description.unwrap_or_else(|| "ok=false".to_string())
            )));
        }

        response
            .result
            .ok_or_else(|| EngineError::Telegram(format!("{} returned no result", method)))
    }

    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, EngineError> {
        self.call(
            "getUpdates",
            serde_json::json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&ReplyKeyboardMarkup>,
    ) -> Result<(), EngineError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = serde_json::to_value(keyboard)
                .map_err(|e| EngineError::Telegram(e.to_string()))?;
        }
        let _: serde_json::Value = self.call("sendMessage", body).await?;
        Ok(())
    }

    pub async fn send_chat_action(&self, chat_id: i64, action: &str) -> Result<(), EngineError> {
        let _: bool = self
            .call(
                "sendChatAction",
                serde_json::json!({ "chat_id": chat_id, "action": action }),
            )
            .await?;
        Ok(())
    }

    pub async fn get_file(&self, file_id: &str) -> Result<File, EngineError> {
        self.call("getFile", serde_json::json!({ "file_id": file_id }))
            .await
    }

    /// Start downloading a file previously resolved with getFile
    pub async fn download(&self, file_path: &str) -> Result<reqwest::Response, EngineError> {
        let response = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(|e| EngineError::Network(crate::secrets::scrub(&e.to_string())))?;

        if !response.status().is_success() {
            return Err(EngineError::Telegram(format!(
                "file download failed with status {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_serialization() {
        let json = serde_json::to_value(ReplyKeyboardMarkup::commands()).unwrap();
        assert_eq!(json["keyboard"][0][0]["text"], "/clear");
        assert_eq!(json["keyboard"][0][1]["text"], "/history");
        assert_eq!(json["keyboard"][0][2]["text"], "/help");
        assert_eq!(json["resize_keyboard"], true);
        assert_eq!(json["one_time_keyboard"], false);

        let json = serde_json::to_value(ReplyKeyboardMarkup::analyze()).unwrap();
        assert_eq!(json["keyboard"][0][0]["text"], "/analyze");
    }

    #[test]
    fn test_urls() {
        let api = TelegramApi::new("https://api.telegram.org/", SecretString::new("42:abc"), 10);
        assert_eq!(
            api.method_url("getMe"),
            "https://api.telegram.org/bot42:abc/getMe"
        );
        assert_eq!(
            api.file_url("documents/file_1.txt"),
            "https://api.telegram.org/file/bot42:abc/documents/file_1.txt"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let api = TelegramApi::new("https://api.telegram.org", SecretString::new("42:abc"), 10);
        assert!(!format!("{:?}", api).contains("42:abc"));
    }

    #[test]
    fn test_update_deserialization() {
        let json = r#"{
            "update_id": 10,
            "message": {
                "message_id": 5,
                "chat": {"id": -100, "type": "private"},
                "from": {"id": 7, "is_bot": false, "first_name": "A"},
                "caption": "my file",
                "document": {"file_id": "F1", "file_name": "notes.md", "mime_type": "text/markdown"}
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let msg = update.message.unwrap();
        assert_eq!(msg.chat.id, -100);
        assert!(msg.text.is_none());
        assert_eq!(msg.document.unwrap().file_name.as_deref(), Some("notes.md"));
    }
}
