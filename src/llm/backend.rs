//! Provider selection
//!
//! `AGENT_BACKEND` names the provider; each provider reads its own
//! `<PREFIX>_API_KEY`, `<PREFIX>_MODEL` and `<PREFIX>_BASE_URL` variables.

use std::fmt;
use std::str::FromStr;

use super::{anthropic_client, openai_client};
use crate::error::{FormIoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentBackend {
    #[default]
    OpenAi,
    Anthropic,
}

impl AgentBackend {
    pub fn name(&self) -> &'static str {
        match self {
            AgentBackend::OpenAi => "OpenAI",
            AgentBackend::Anthropic => "Anthropic",
        }
    }

    pub fn api_key_var(&self) -> &'static str {
        match self {
            AgentBackend::OpenAi => "OPENAI_API_KEY",
            AgentBackend::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn model_var(&self) -> &'static str {
        match self {
            AgentBackend::OpenAi => "OPENAI_MODEL",
            AgentBackend::Anthropic => "ANTHROPIC_MODEL",
        }
    }

    pub fn base_url_var(&self) -> &'static str {
        match self {
            AgentBackend::OpenAi => "OPENAI_BASE_URL",
            AgentBackend::Anthropic => "ANTHROPIC_BASE_URL",
        }
    }

    /// Model used when `<PREFIX>_MODEL` is unset
    pub fn default_model(&self) -> &'static str {
        match self {
            AgentBackend::OpenAi => openai_client::DEFAULT_MODEL,
            AgentBackend::Anthropic => anthropic_client::DEFAULT_MODEL,
        }
    }
}

impl FromStr for AgentBackend {
    type Err = FormIoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Ok(AgentBackend::OpenAi),
            "anthropic" | "claude" => Ok(AgentBackend::Anthropic),
            other => Err(FormIoError::Config(format!(
                "AGENT_BACKEND '{}' is not supported (openai, gpt, anthropic, claude)",
                other
            ))),
        }
    }
}

impl fmt::Display for AgentBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
