//! Telegram Bot Integration
//!
//! Long-polls the Bot API and turns each inbound message into calls against
//! the conversation core and the completion provider. Every update is handled
//! on its own task so a slow completion in one chat never delays another.

use anyhow::Result;
use sdk::errors::{BridgeErrorExt, EngineError};
use sdk::types::{MediaInfo, Role, SessionKey};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::api::{Message, ReplyKeyboardMarkup, TelegramApi, Update};
use crate::config::TelegramConfig;
use crate::conversation::ConversationManager;
use crate::files::{read_file_content, FileStore, UploadRegistry, UploadedFile};
use crate::llm::{LLMError, LLMProvider};

const RETRY_DELAY_SECS: u64 = 5;

const WELCOME_TEXT: &str = "Hello! I am your Claude AI assistant bot. How can I help you today? \
     You can also send me images and files!";

const HELP_TEXT: &str = "Available commands:\n\
     /start - Start the bot\n\
     /clear - Clear conversation history\n\
     /history - View recent conversation\n\
     /analyze - Analyze the last uploaded file\n\
     /help - Show this help message\n\n\
     Simply send a message to chat with Claude AI.\n\
     You can also send images and files that I can see and process.";

const CLEARED_TEXT: &str = "Conversation history cleared!";
const NO_UPLOAD_TEXT: &str = "No file to analyze. Please upload a file first.";
const GENERIC_ERROR_TEXT: &str = "Sorry, I encountered an error. Please try again later.";

/// Built-in bot commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Clear,
    History,
    Help,
    Analyze,
}

impl Command {
    /// Parse the leading `/command` (or `/command@botname`) of a message
    ///
    /// Returns `None` for text that is not a known command.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name {
            "start" => Some(Command::Start),
            "clear" => Some(Command::Clear),
            "history" => Some(Command::History),
            "help" => Some(Command::Help),
            "analyze" => Some(Command::Analyze),
            _ => None,
        }
    }
}

/// What an inbound message asks the bot to do
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Command(Command),
    Photo,
    Document,
    Text(String),
    /// Unknown commands, stickers, service messages
    Ignored,
}

impl Inbound {
    pub fn classify(msg: &Message) -> Self {
        if msg.photo.as_ref().is_some_and(|p| !p.is_empty()) {
            return Inbound::Photo;
        }
        if msg.document.is_some() {
            return Inbound::Document;
        }
        match msg.text.as_deref() {
            Some(text) if text.starts_with('/') => {
                Command::parse(text).map_or(Inbound::Ignored, Inbound::Command)
            }
            Some(text) if !text.trim().is_empty() => Inbound::Text(text.to_string()),
            _ => Inbound::Ignored,
        }
    }
}

/// User turn recorded for `/analyze`
pub fn analyze_prompt(file_content: &str) -> String {
    format!(
        "Please analyze the following file content:\n\n{}\n\nProvide a summary and any insights about this content.",
        file_content
    )
}

#[derive(Clone)]
pub struct TelegramBot {
    api: TelegramApi,
    config: TelegramConfig,
    conversations: Arc<ConversationManager>,
    provider: Arc<dyn LLMProvider>,
    files: FileStore,
    uploads: Arc<UploadRegistry>,
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("api", &self.api)
            .field("provider", &self.provider.name())
            .field("uploads_dir", &self.files.dir())
            .finish()
    }
}

impl TelegramBot {
    pub fn new(
        api: TelegramApi,
        config: TelegramConfig,
        conversations: Arc<ConversationManager>,
        provider: Arc<dyn LLMProvider>,
        files: FileStore,
    ) -> Self {
        Self {
            api,
            config,
            conversations,
            provider,
            files,
            uploads: Arc::new(UploadRegistry::new()),
        }
    }

    pub fn conversations(&self) -> &ConversationManager {
        &self.conversations
    }

    pub fn uploads(&self) -> &UploadRegistry {
        &self.uploads
    }

    /// Start the long-polling loop
    ///
    /// This will block the current task. Should be spawned in a background tokio::task.
    pub async fn start_polling(&self) -> Result<()> {
        info!("Starting Telegram bot long-polling loop...");
        let mut offset = 0;

        loop {
            match self
                .api
                .get_updates(offset, self.config.poll_timeout_secs)
                .await
            {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let bot = self.clone();
                        tokio::spawn(async move {
                            bot.handle_update(update).await;
                        });
                    }
                    if self.config.poll_interval_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms))
                            .await;
                    }
                }
                Err(e) => {
                    error!("Failed to fetch Telegram updates: {}", e);
                    tokio::time::sleep(Duration::from_secs(RETRY_DELAY_SECS)).await;
                }
            }
        }
    }

    pub async fn handle_update(&self, update: Update) {
        let Some(msg) = update.message else {
            debug!("Update {} carries no message - ignoring", update.update_id);
            return;
        };

        let chat_id = msg.chat.id;
        match Inbound::classify(&msg) {
            Inbound::Command(cmd) => self.handle_command(chat_id, cmd).await,
            Inbound::Photo => self.handle_photo(&msg).await,
            Inbound::Document => self.handle_document(&msg).await,
            Inbound::Text(text) => self.handle_text(chat_id, &text).await,
            Inbound::Ignored => debug!("Ignoring message {} in chat {}", msg.message_id, chat_id),
        }
    }

    async fn handle_command(&self, chat_id: i64, cmd: Command) {
        info!("Command {:?} in chat {}", cmd, chat_id);
        let key = SessionKey::from(chat_id);

        match cmd {
            Command::Start => self.reply(chat_id, WELCOME_TEXT).await,
            Command::Help => self.reply(chat_id, HELP_TEXT).await,
            Command::Clear => {
                self.conversations.clear_conversation(&key);
                self.reply(chat_id, CLEARED_TEXT).await;
            }
            Command::History => {
                let summary = self.conversations.summarize(&key);
                self.reply(chat_id, &summary).await;
            }
            Command::Analyze => self.handle_analyze(chat_id).await,
        }
    }

    async fn handle_analyze(&self, chat_id: i64) {
        let key = SessionKey::from(chat_id);
        let Some(upload) = self.uploads.last(&key) else {
            self.reply(chat_id, NO_UPLOAD_TEXT).await;
            return;
        };

        self.typing(chat_id).await;

        let content = match read_file_content(&upload.path).await {
            Ok(content) => content,
            Err(e) => {
                self.report(chat_id, "File analysis", "Sorry, I couldn't analyze this file. ", &e)
                    .await;
                return;
            }
        };

        if let Err(e) = self
            .conversations
            .add_message(&key, Role::User, analyze_prompt(&content), None)
        {
            self.report(
                chat_id,
                "File analysis",
                "Sorry, I couldn't analyze this file. ",
                &EngineError::from(e),
            )
            .await;
            return;
        }

        self.reply(chat_id, &format!("Analyzing file: {}...", upload.file_name))
            .await;
        self.complete_and_reply(chat_id, "File analysis").await;
    }

    async fn handle_photo(&self, msg: &Message) {
        let chat_id = msg.chat.id;
        let key = SessionKey::from(chat_id);
        self.typing(chat_id).await;

        // Telegram lists sizes smallest first
        let Some(photo) = msg.photo.as_ref().and_then(|sizes| sizes.last()) else {
            return;
        };
        let caption = msg.caption.as_deref().unwrap_or("Image");

        let result = async {
            let stored = self
                .download(&photo.file_id, &format!("photo_{}", chat_id))
                .await?;
            let url = self.files.file_url(&stored.file_name);
            let media = MediaInfo::new(json!({
                "kind": "photo",
                "file_name": stored.file_name,
                "url": url,
                "width": photo.width,
                "height": photo.height,
            }));
            self.conversations.add_message(
                &key,
                Role::User,
                format!("[{}] - Image uploaded: {}", caption, url),
                Some(media),
            )?;
            Ok::<_, EngineError>(())
        }
        .await;

        match result {
            Ok(()) => {
                let reply = match &msg.caption {
                    Some(c) => format!("I've received your image with caption: \"{}\".", c),
                    None => "I've received your image.".to_string(),
                };
                self.reply(chat_id, &reply).await;
            }
            Err(e) => {
                self.report(chat_id, "Photo upload", "Sorry, I couldn't process this image. ", &e)
                    .await
            }
        }
    }

    async fn handle_document(&self, msg: &Message) {
        let chat_id = msg.chat.id;
        let key = SessionKey::from(chat_id);
        self.typing(chat_id).await;

        let Some(document) = msg.document.as_ref() else {
            return;
        };
        let file_name = document.file_name.as_deref().unwrap_or("document");
        let mime_type = document.mime_type.as_deref().unwrap_or("unknown");
        let caption = msg.caption.as_deref().unwrap_or("Document");

        let result = async {
            let stored = self.download(&document.file_id, file_name).await?;
            let url = self.files.file_url(&stored.file_name);

            self.uploads.remember(
                key.clone(),
                UploadedFile {
                    file_name: file_name.to_string(),
                    path: stored.path.clone(),
                    url: url.clone(),
                    mime_type: document.mime_type.clone(),
                },
            );

            let media = MediaInfo::new(json!({
                "kind": "document",
                "file_name": file_name,
                "mime_type": mime_type,
                "url": url,
            }));
            self.conversations.add_message(
                &key,
                Role::User,
                format!(
                    "[{}] - File uploaded: {} (name: {}, type: {})",
                    caption, url, file_name, mime_type
                ),
                Some(media),
            )?;
            Ok::<_, EngineError>(())
        }
        .await;

        match result {
            Ok(()) => {
                let with_caption = msg
                    .caption
                    .as_ref()
                    .map(|c| format!(" with caption: \"{}\"", c))
                    .unwrap_or_default();
                let reply = format!(
                    "I've received your file: \"{}\"{}.\nUse /analyze to analyze the content of this file.",
                    file_name, with_caption
                );
                self.send(chat_id, &reply, &ReplyKeyboardMarkup::analyze())
                    .await;
            }
            Err(e) => {
                self.report(chat_id, "Document upload", "Sorry, I couldn't process this file. ", &e)
                    .await
            }
        }
    }

    async fn handle_text(&self, chat_id: i64, text: &str) {
        info!("Message in chat {} ({} chars)", chat_id, text.chars().count());
        let key = SessionKey::from(chat_id);
        self.typing(chat_id).await;

        if let Err(e) = self.conversations.add_message(&key, Role::User, text, None) {
            self.report(chat_id, "Text message", "", &EngineError::from(e))
                .await;
            return;
        }
        self.complete_and_reply(chat_id, "Text message").await;
    }

    /// Send the session to the provider, record the answer and deliver it
    async fn complete_and_reply(&self, chat_id: i64, context: &str) {
        let key = SessionKey::from(chat_id);
        let prompt = self.conversations.format_for_completion(&key);

        let completion = match self.provider.complete(&prompt).await {
            Ok(completion) => completion,
            Err(e) => {
                self.report_llm(chat_id, context, &e).await;
                return;
            }
        };

        if let Err(e) =
            self.conversations
                .add_message(&key, Role::Assistant, completion.text.as_str(), None)
        {
            warn!("Could not record reply in chat {}: {}", chat_id, e);
        }
        self.reply(chat_id, &completion.text).await;
    }

    async fn download(&self, file_id: &str, base_name: &str) -> Result<crate::files::StoredFile, EngineError> {
        let file = self.api.get_file(file_id).await?;
        let remote_path = file
            .file_path
            .ok_or_else(|| EngineError::Telegram("getFile returned no file_path".to_string()))?;
        let response = self.api.download(&remote_path).await?;
        self.files
            .save_response(base_name, &remote_path, response)
            .await
    }

    async fn typing(&self, chat_id: i64) {
        if let Err(e) = self.api.send_chat_action(chat_id, "typing").await {
            debug!("Failed to send typing action to {}: {}", chat_id, e);
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        self.send(chat_id, text, &ReplyKeyboardMarkup::commands())
            .await
    }

    async fn send(&self, chat_id: i64, text: &str, keyboard: &ReplyKeyboardMarkup) {
        if let Err(e) = self.api.send_message(chat_id, text, Some(keyboard)).await {
            error!("Failed to send reply to {}: {}", chat_id, e);
        }
    }

    async fn report(&self, chat_id: i64, context: &str, prefix: &str, err: &EngineError) {
        error!(
            chat_id,
            context,
            recoverable = err.is_recoverable(),
            "{}",
            crate::secrets::scrub(&err.to_string())
        );
        let hint = match err {
            EngineError::FileTooLarge { .. } => err.to_string(),
            EngineError::Network(_) => err.user_hint().to_string() + ".",
            _ => GENERIC_ERROR_TEXT.to_string(),
        };
        self.reply(chat_id, &format!("{}{}", prefix, hint)).await;
    }

    async fn report_llm(&self, chat_id: i64, context: &str, err: &LLMError) {
        error!(
            chat_id,
            context,
            "Completion failed: {}",
            crate::secrets::scrub(&err.to_string())
        );
        let prefix = if context == "File analysis" {
            "Sorry, I couldn't analyze this file. "
        } else {
            ""
        };
        self.reply(chat_id, &format!("{}{}", prefix, err.user_message()))
            .await;
    }
}
