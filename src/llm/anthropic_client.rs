//! Anthropic messages API
//!
//! There is no JSON mode; `chat_json` appends a JSON-only instruction to the
//! system prompt and callers strip any code fence that slips through.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::llm_client::LlmClient;
use super::MAX_REPLY_TOKENS;
use crate::error::{FormIoError, Result};
use crate::http::{ensure_success, send_with_retry, HttpSettings};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "Anthropic";

const JSON_ONLY: &str =
    "Reply with one JSON object and nothing else: no prose, no markdown fences.";

#[derive(Deserialize)]
struct MessageReply {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
    base_url: String,
    settings: HttpSettings,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: &str, settings: HttpSettings) -> Result<Self> {
        Ok(Self {
            api_key,
            client: settings.build_client()?,
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            settings,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn request_body(&self, system_prompt: &str, user_prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_REPLY_TOKENS,
            "system": system_prompt,
            "messages": [{ "role": "user", "content": user_prompt }],
        })
    }

    async fn send_message(&self, body: Value) -> Result<String> {
        let url = format!("{}/messages", self.base_url);
        let response = send_with_retry(PROVIDER, &self.settings, || {
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&body)
                .send()
        })
        .await?;

        let reply: MessageReply = ensure_success(response).await?.json().await.map_err(|e| {
            FormIoError::response_format(format!("{} message envelope: {}", PROVIDER, e))
        })?;
        let text = reply
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| FormIoError::response_format("Anthropic reply had no text block"))?;
        debug!(provider = PROVIDER, reply = %text, "Message received");
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let system_prompt = format!("{}\n\n{}", system_prompt, JSON_ONLY);
        self.send_message(self.request_body(&system_prompt, user_prompt))
            .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }
}
