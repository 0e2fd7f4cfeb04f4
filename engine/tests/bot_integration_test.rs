//! Telegram adapter tests
//!
//! The Bot API is a wiremock server and the completion provider a scripted
//! stub, so each test inspects exactly what the bot sent back to the chat and
//! what it asked the model.

use async_trait::async_trait;
use parley_engine::bot::{TelegramApi, TelegramBot};
use parley_engine::config::TelegramConfig;
use parley_engine::conversation::ConversationManager;
use parley_engine::files::FileStore;
use parley_engine::llm::{self, Completion, LLMError, LLMProvider, MessageRole, Prompt};
use parley_engine::secrets::SecretString;
use sdk::types::{Role, SessionKey};
use serde_json::{json, Value};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const TOKEN: &str = "123456:test-token";
const CHAT: i64 = 4242;

/// Provider answering from a script and remembering every prompt
struct ScriptedProvider {
    reply: std::result::Result<String, u16>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedProvider {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing(status: u16) -> Self {
        Self {
            reply: Err(status),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn complete(&self, prompt: &Prompt) -> llm::Result<Completion> {
        self.prompts.lock().unwrap().push(prompt.clone());
        match &self.reply {
            Ok(text) => Ok(Completion {
                id: "msg_test".to_string(),
                model: "scripted-1".to_string(),
                text: text.clone(),
            }),
            Err(status) => Err(LLMError::from_status(*status, "nope".to_string())),
        }
    }
}

struct Harness {
    server: MockServer,
    bot: TelegramBot,
    provider: Arc<ScriptedProvider>,
    _uploads: TempDir,
}

impl Harness {
    async fn new(provider: ScriptedProvider) -> Self {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/bot{}/sendMessage", TOKEN)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"message_id": 1, "chat": {"id": CHAT}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{}/sendChatAction", TOKEN)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": true})))
            .mount(&server)
            .await;

        let uploads = TempDir::new().unwrap();
        let provider = Arc::new(provider);
        let bot = TelegramBot::new(
            TelegramApi::new(server.uri(), SecretString::new(TOKEN), 1),
            TelegramConfig::default(),
            Arc::new(ConversationManager::new(
                NonZeroUsize::new(10).unwrap(),
                "You are helpful.",
            )),
            provider.clone(),
            FileStore::new(uploads.path(), "http://localhost:3000"),
        );

        Self {
            server,
            bot,
            provider,
            _uploads: uploads,
        }
    }

    async fn mount_file(&self, file_id: &str, file_path: &str, body: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/bot{}/getFile", TOKEN)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"file_id": file_id, "file_path": file_path}
            })))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/file/bot{}/{}", TOKEN, file_path)))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    async fn send(&self, message: Value) {
        let mut message = message;
        message["message_id"] = json!(1);
        message["chat"] = json!({"id": CHAT, "type": "private"});
        let update = serde_json::from_value(json!({"update_id": 1, "message": message})).unwrap();
        self.bot.handle_update(update).await;
    }

    /// Bodies of every sendMessage call so far
    async fn replies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path().ends_with("/sendMessage"))
            .map(|r| r.body_json::<Value>().unwrap())
            .collect()
    }

    async fn reply_texts(&self) -> Vec<String> {
        self.replies()
            .await
            .iter()
            .map(|b| b["text"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn history(&self) -> Vec<sdk::types::ChatMessage> {
        self.bot.conversations().get_conversation(&SessionKey::from(CHAT))
    }
}

#[tokio::test]
async fn test_text_round_trip() {
    let h = Harness::new(ScriptedProvider::replying("Hi there!")).await;

    h.send(json!({"text": "Hello bot"})).await;

    let prompts = h.provider.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].directive, "You are helpful.");
    assert_eq!(prompts[0].turns.len(), 1);
    assert_eq!(prompts[0].turns[0].role, MessageRole::User);
    assert_eq!(prompts[0].turns[0].content, "Hello bot");

    let replies = h.replies().await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["chat_id"], CHAT);
    assert_eq!(replies[0]["text"], "Hi there!");
    assert_eq!(replies[0]["reply_markup"]["keyboard"][0][0]["text"], "/clear");

    let history = h.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, "Hi there!");
}

#[tokio::test]
async fn test_provider_failure_reaches_user() {
    let h = Harness::new(ScriptedProvider::failing(429)).await;

    h.send(json!({"text": "Hello bot"})).await;

    assert_eq!(
        h.reply_texts().await,
        vec!["Rate limit exceeded. Please try again in a few moments."]
    );
    // The user turn stays, no assistant turn is recorded
    let history = h.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::User);
}

#[tokio::test]
async fn test_clear_and_history_commands() {
    let h = Harness::new(ScriptedProvider::replying("Sure.")).await;

    h.send(json!({"text": "/history"})).await;
    h.send(json!({"text": "Remember this"})).await;
    h.send(json!({"text": "/history@parley_bot"})).await;
    h.send(json!({"text": "/clear"})).await;

    let texts = h.reply_texts().await;
    assert_eq!(texts[0], "No conversation history yet.");
    assert_eq!(texts[1], "Sure.");
    assert_eq!(
        texts[2],
        "Conversation History:\n\n1. 🧑 You: Remember this\n\n2. 🤖 Claude: Sure."
    );
    assert_eq!(texts[3], "Conversation history cleared!");
    assert!(h.history().is_empty());
}

#[tokio::test]
async fn test_start_help_and_unknown_commands() {
    let h = Harness::new(ScriptedProvider::replying("unused")).await;

    h.send(json!({"text": "/start"})).await;
    h.send(json!({"text": "/help"})).await;
    h.send(json!({"text": "/weather tomorrow"})).await;

    let texts = h.reply_texts().await;
    assert_eq!(texts.len(), 2);
    assert!(texts[0].starts_with("Hello! I am your Claude AI assistant bot."));
    assert!(texts[1].starts_with("Available commands:"));
    assert!(h.provider.prompts().is_empty());
    assert!(h.history().is_empty());
}

#[tokio::test]
async fn test_analyze_without_upload() {
    let h = Harness::new(ScriptedProvider::replying("unused")).await;

    h.send(json!({"text": "/analyze"})).await;

    assert_eq!(
        h.reply_texts().await,
        vec!["No file to analyze. Please upload a file first."]
    );
    assert!(h.provider.prompts().is_empty());
}

#[tokio::test]
async fn test_document_upload_then_analyze() {
    let h = Harness::new(ScriptedProvider::replying("Two columns of numbers.")).await;
    h.mount_file("DOC1", "documents/file_7.csv", "a,b\n1,2").await;

    h.send(json!({
        "caption": "my data",
        "document": {"file_id": "DOC1", "file_name": "data.csv", "mime_type": "text/csv"}
    }))
    .await;

    let upload = h.bot.uploads().last(&SessionKey::from(CHAT)).unwrap();
    assert_eq!(upload.file_name, "data.csv");
    assert!(upload.path.exists());
    assert!(upload.url.starts_with("http://localhost:3000/uploads/data_csv_"));
    assert!(upload.url.ends_with(".csv"));

    let history = h.history();
    assert_eq!(history.len(), 1);
    assert!(history[0].has_media());
    assert_eq!(
        history[0].content,
        format!(
            "[my data] - File uploaded: {} (name: data.csv, type: text/csv)",
            upload.url
        )
    );

    let replies = h.replies().await;
    assert_eq!(replies[0]["reply_markup"]["keyboard"][0][0]["text"], "/analyze");
    assert!(replies[0]["text"].as_str().unwrap().contains("/analyze"));

    h.send(json!({"text": "/analyze"})).await;

    let prompts = h.provider.prompts();
    assert_eq!(prompts.len(), 1);
    let last = prompts[0].last_user_turn().unwrap();
    assert_eq!(
        last.content,
        "Please analyze the following file content:\n\na,b\n1,2\n\nProvide a summary and any insights about this content."
    );

    let texts = h.reply_texts().await;
    assert_eq!(texts[1], "Analyzing file: data.csv...");
    assert_eq!(texts[2], "Two columns of numbers.");
    assert_eq!(h.history().len(), 3);
}

#[tokio::test]
async fn test_photo_upload_uses_largest_size() {
    let h = Harness::new(ScriptedProvider::replying("unused")).await;
    h.mount_file("BIG", "photos/file_3.jpg", "jpegbytes").await;

    h.send(json!({
        "photo": [
            {"file_id": "SMALL", "width": 90, "height": 90},
            {"file_id": "BIG", "width": 1280, "height": 960}
        ]
    }))
    .await;

    let history = h.history();
    assert_eq!(history.len(), 1);
    assert!(history[0].has_media());
    assert!(history[0]
        .content
        .starts_with(&format!("[Image] - Image uploaded: http://localhost:3000/uploads/photo_{}_", CHAT)));

    let media = history[0].media.as_ref().unwrap().value();
    assert_eq!(media["width"], 1280);

    let get_file_ids: Vec<String> = h
        .server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path().ends_with("/getFile"))
        .map(|r| r.body_json::<Value>().unwrap()["file_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(get_file_ids, vec!["BIG"]);

    assert_eq!(h.reply_texts().await, vec!["I've received your image."]);
    assert!(h.provider.prompts().is_empty());
}

#[tokio::test]
async fn test_failed_download_is_reported() {
    let h = Harness::new(ScriptedProvider::replying("unused")).await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/getFile", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "description": "Bad Request: file is too big"
        })))
        .mount(&h.server)
        .await;

    h.send(json!({
        "document": {"file_id": "HUGE", "file_name": "big.bin"}
    }))
    .await;

    let texts = h.reply_texts().await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("Sorry, I couldn't process this file. "));
    assert!(h.history().is_empty());
    assert!(h.bot.uploads().last(&SessionKey::from(CHAT)).is_none());
}
