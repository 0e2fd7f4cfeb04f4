use super::{Completion, LLMError, LLMProvider, Prompt};
use crate::config::AnthropicConfig;
use crate::secrets::SecretString;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct AnthropicProvider {
    config: AnthropicConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig, api_key: SecretString) -> Self {
        Self {
            config,
            api_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn max_tokens(&self) -> u32 {
        self.config.max_tokens
    }

    pub fn temperature(&self) -> f64 {
        self.config.temperature
    }

    /// JSON body of a Messages API request
    ///
    /// The directive goes to the top-level `system` field, the turns to
    /// `messages`.
    pub fn request_body(&self, prompt: &Prompt) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = prompt
            .turns
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content,
                })
            })
            .collect();

        let mut body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": messages,
        });
        if !prompt.directive.is_empty() {
            body["system"] = json!(prompt.directive);
        }
        body
    }
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .field("api_key", &self.api_key)
            .finish()
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn check_health(&self) -> bool {
        !self.api_key.unsecure().is_empty()
    }

    async fn complete(&self, prompt: &Prompt) -> super::Result<Completion> {
        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));
        let payload = self.request_body(prompt);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.unsecure())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(status, text));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let content_arr = data
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| LLMError::ParseError("No content array in response".to_string()))?;

        let mut full_content = String::new();
        for item in content_arr {
            if let Some(text) = item.get("text").and_then(|t| t.as_str()) {
                full_content.push_str(text);
            }
        }

        if full_content.trim().is_empty() {
            return Err(LLMError::EmptyResponse);
        }

        Ok(Completion {
            id: data
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            model: data
                .get("model")
                .and_then(|v| v.as_str())
                .unwrap_or(self.config.model.as_str())
                .to_string(),
            text: full_content,
        })
    }
}
