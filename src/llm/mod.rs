//! Language-model clients
//!
//! Set `AGENT_BACKEND` to pick the provider:
//! - `openai` (default): OpenAI chat completions
//! - `anthropic`: Anthropic messages API

pub mod anthropic_client;
pub mod backend;
pub mod client_factory;
pub mod llm_client;
pub mod openai_client;

pub use backend::AgentBackend;
pub use client_factory::create_llm_client;
pub use llm_client::{strip_code_fence, LlmClient};

/// Both replies the pipeline asks for are small JSON objects
pub const MAX_REPLY_TOKENS: u32 = 800;

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted LLM client for pipeline tests

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::LlmClient;
    use crate::error::{FormIoError, Result};

    /// A recorded call: (system prompt, user prompt)
    pub type RecordedCall = (String, String);

    /// Returns queued replies in order and records every prompt it receives
    #[derive(Default)]
    pub struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<String>>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedLlm {
        pub fn new<I, S>(replies: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(err: FormIoError) -> Self {
            Self {
                replies: Mutex::new(VecDeque::from([Err(err)])),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), user_prompt.to_string()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FormIoError::response_format("no scripted reply left")))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }

        fn provider_name(&self) -> &str {
            "Scripted"
        }
    }
}
