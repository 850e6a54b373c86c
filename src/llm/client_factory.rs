//! Client Factory
//!
//! Builds the single LLM client the process uses, from configuration.

use std::sync::Arc;

use tracing::info;

use super::anthropic_client::AnthropicClient;
use super::backend::AgentBackend;
use super::llm_client::LlmClient;
use super::openai_client::OpenAiClient;
use crate::config::LlmConfig;
use crate::error::{FormIoError, Result};
use crate::http::HttpSettings;

/// Create the configured LLM client
pub fn create_llm_client(config: &LlmConfig, settings: HttpSettings) -> Result<Arc<dyn LlmClient>> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        FormIoError::Config(format!(
            "{} environment variable not set",
            config.backend.api_key_var()
        ))
    })?;

    let client: Arc<dyn LlmClient> = match config.backend {
        AgentBackend::OpenAi => {
            let mut client = OpenAiClient::new(api_key, &config.model, settings)?;
            if let Some(base_url) = &config.base_url {
                client = client.with_base_url(base_url);
            }
            Arc::new(client)
        }
        AgentBackend::Anthropic => {
            let mut client = AnthropicClient::new(api_key, &config.model, settings)?;
            if let Some(base_url) = &config.base_url {
                client = client.with_base_url(base_url);
            }
            Arc::new(client)
        }
    };

    info!(
        provider = client.provider_name(),
        model = client.model_name(),
        "LLM client ready"
    );
    Ok(client)
}
