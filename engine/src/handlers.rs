//! Command handlers for CLI operations
//!
//! - run: start the Telegram bot and the upload file server
//! - check: validate configuration and credentials

use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;

use crate::bot::{TelegramApi, TelegramBot};
use crate::config::Config;
use crate::conversation::ConversationManager;
use crate::files::FileStore;
use crate::llm::{AnthropicProvider, LLMProvider, LoggedProvider};
use crate::secrets::Credentials;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Completion provider for `config`: Anthropic wrapped in the request logger
pub fn build_provider(config: &Config, credentials: &Credentials) -> Arc<dyn LLMProvider> {
    let log_path = config.anthropic.api_log.then(|| config.api_log_path());
    let inner = AnthropicProvider::new(
        config.anthropic.clone(),
        credentials.anthropic_api_key.clone(),
    );
    Arc::new(LoggedProvider::new(inner, &config.anthropic, log_path))
}

/// Wire the bot from configuration and credentials
pub fn build_bot(config: &Config, credentials: &Credentials) -> Result<TelegramBot> {
    let conversations = Arc::new(ConversationManager::from_config(&config.conversation)?);
    let api = TelegramApi::new(
        config.telegram.api_base_url.clone(),
        credentials.telegram_token.clone(),
        config.telegram.poll_timeout_secs,
    );
    let files = FileStore::new(&config.server.uploads_dir, config.server.public_url.clone());

    Ok(TelegramBot::new(
        api,
        config.telegram.clone(),
        conversations,
        build_provider(config, credentials),
        files,
    ))
}

/// Run the bridge until Ctrl-C
pub async fn handle_run(config: &Config) -> Result<()> {
    let credentials = Credentials::from_env().context("Failed to load credentials")?;
    let bot = build_bot(config, &credentials)?;

    let (addr, shutdown_tx) = crate::server::spawn(&config.server)
        .await
        .context("Failed to start file server")?;
    tracing::info!(
        "Uploads served at {}/uploads (bound to {})",
        config.server.public_url.trim_end_matches('/'),
        addr
    );
    tracing::info!(
        model = %config.anthropic.model,
        max_history_pairs = config.conversation.max_history_pairs,
        "Parley bridge started"
    );

    tokio::select! {
        res = bot.start_polling() => {
            if let Err(e) = res {
                tracing::error!("Polling loop stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down");
        }
    }

    shutdown_tx.send(()).ok();
    Ok(())
}

/// Validate configuration and credentials
///
/// Issues are reported, not returned as errors, so every check runs.
pub async fn handle_check(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    match config.validate() {
        Ok(()) => checks.push(("Configuration", "Valid".to_string())),
        Err(e) => {
            checks.push(("Configuration", "Invalid".to_string()));
            issues.push(e.to_string());
        }
    }

    if config.server.uploads_dir.exists() {
        checks.push(("Uploads directory", "Exists".to_string()));
    } else {
        checks.push(("Uploads directory", "Missing".to_string()));
        issues.push(format!(
            "Uploads directory does not exist: {:?}",
            config.server.uploads_dir
        ));
    }

    checks.push(("Model", config.anthropic.model.clone()));
    checks.push((
        "History",
        format!("{} pairs", config.conversation.max_history_pairs),
    ));

    match Credentials::from_env() {
        Ok(credentials) => {
            checks.push(("Credentials", "Configured".to_string()));
            let provider = build_provider(config, &credentials);
            if provider.check_health().await {
                checks.push(("Anthropic provider", "Ready".to_string()));
            } else {
                checks.push(("Anthropic provider", "Not ready".to_string()));
                issues.push("Anthropic provider is not ready".to_string());
            }
        }
        Err(e) => {
            checks.push(("Credentials", "Missing".to_string()));
            issues.push(e.to_string());
        }
    }

    match format {
        OutputFormat::Text => {
            println!("Parley Configuration Check");
            println!("==========================");
            println!();

            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
