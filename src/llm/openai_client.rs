//! OpenAI chat completions
//!
//! Requests run with `response_format: json_object`, so replies are a bare
//! object and never need fence stripping in practice.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::llm_client::LlmClient;
use super::MAX_REPLY_TOKENS;
use crate::error::{FormIoError, Result};
use crate::http::{ensure_success, send_with_retry, HttpSettings};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const PROVIDER: &str = "OpenAI";

#[derive(Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
    base_url: String,
    settings: HttpSettings,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: &str, settings: HttpSettings) -> Result<Self> {
        Ok(Self {
            api_key,
            client: settings.build_client()?,
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            settings,
        })
    }

    /// Point the client at a compatible endpoint (proxy, local gateway)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn request_body(&self, system_prompt: &str, user_prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_REPLY_TOKENS,
            "temperature": 0.1,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
            "response_format": { "type": "json_object" },
        })
    }

    async fn complete(&self, body: Value) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = send_with_retry(PROVIDER, &self.settings, || {
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
        })
        .await?;
        let text = ensure_success(response)
            .await?
            .text()
            .await
            .map_err(|e| FormIoError::transport(PROVIDER, &e))?;
        let preview: String = text.chars().take(1000).collect();
        debug!(provider = PROVIDER, reply = %preview, "Completion received");

        let completion: Completion = serde_json::from_str(&text).map_err(|e| {
            FormIoError::response_format(format!("{} completion envelope: {}", PROVIDER, e))
        })?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| FormIoError::response_format("OpenAI completion had no message content"))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.complete(self.request_body(system_prompt, user_prompt))
            .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }
}
