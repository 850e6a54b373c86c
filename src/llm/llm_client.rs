//! Provider-neutral language-model interface
//!
//! One client is built at startup and handed to the matcher and updater as
//! `Arc<dyn LlmClient>`.

use async_trait::async_trait;

use crate::error::Result;

/// A chat-style language model
///
/// Every pipeline call wants a structured reply, so the only request shape
/// is "system instruction + user prompt, answer with a JSON object". The raw
/// text comes back unparsed; parsing is the caller's job.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;

    /// Provider label used in logs and error messages
    fn provider_name(&self) -> &str;
}

/// Strip a ```json fence some models wrap around JSON replies
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  plain text "), "plain text");
    }
}
