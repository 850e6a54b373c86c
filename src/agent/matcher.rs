//! Parameter Matcher
//!
//! First language-model call: given a prompt and its routed domain, ask the
//! model to pick exactly one key from that domain's allow-list. Anything the
//! model answers outside the list is rejected here and never reaches the
//! update stage.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{FormIoError, Result};
use crate::llm::{strip_code_fence, LlmClient};
use crate::parameters::{normalize_key, AgentDomain, ParameterCatalog};

/// Reply shape the matcher asks for: `{"match": "<key>"}`
#[derive(Debug, Clone, Deserialize)]
pub struct MatchReply {
    #[serde(rename = "match", default)]
    pub matched: Option<String>,
}

impl MatchReply {
    /// Parse a raw model reply; anything that is not a JSON object is a format error
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(strip_code_fence(raw))
            .map_err(|e| FormIoError::response_format(format!("match reply: {}", e)))
    }
}

pub struct ParameterMatcher {
    client: Arc<dyn LlmClient>,
    catalog: Arc<ParameterCatalog>,
}

impl ParameterMatcher {
    pub fn new(client: Arc<dyn LlmClient>, catalog: Arc<ParameterCatalog>) -> Self {
        Self { client, catalog }
    }

    /// Select the single allow-listed key the prompt refers to
    pub async fn match_key(&self, prompt: &str, domain: AgentDomain) -> Result<String> {
        if !domain.is_routable() {
            return Err(FormIoError::validation(
                "Prompt does not refer to a building, envelope or facade parameter",
            ));
        }

        let system_prompt = self.build_system_prompt(domain);
        let raw = self.client.chat_json(&system_prompt, prompt).await?;
        debug!(%domain, reply = %raw, "Match reply");

        let reply = MatchReply::parse(&raw)?;
        let candidate = reply.matched.unwrap_or_default();
        let key = candidate.trim();

        let in_domain = self.catalog.domain_of(key) == Some(domain);
        if !self.catalog.is_valid_key(key) || !in_domain {
            let respelled = normalize_key(key);
            if respelled != key && self.catalog.is_valid_key(&respelled) {
                warn!(
                    %domain,
                    candidate = %candidate,
                    listed = %respelled,
                    "Model misspelled an allow-listed key"
                );
            } else {
                warn!(%domain, candidate = %candidate, "Model matched a key outside the allow-list");
            }
            return Err(FormIoError::invalid_parameter(candidate));
        }
        let key = key.to_string();

        info!(%domain, key = %key, "Matched parameter");
        Ok(key)
    }

    fn build_system_prompt(&self, domain: AgentDomain) -> String {
        let options = self
            .catalog
            .keys_for(domain)
            .into_iter()
            .filter_map(|key| self.catalog.spec_for(key))
            .map(|spec| {
                if spec.description.is_empty() {
                    format!("- {}", spec.key)
                } else {
                    format!("- {}: {}", spec.key, spec.description)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are an expert in parametric design working on the {domain} of a project.
Decide which single parameter the user's request refers to.

## Valid parameters

{options}

## Rules

1. Answer with exactly one key from the list above, spelled exactly as listed.
2. Do not invent keys and do not answer with more than one key.
3. Respond with a JSON object only: {{"match": "<parameter key>"}}"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;

    fn matcher(llm: Arc<ScriptedLlm>) -> ParameterMatcher {
        ParameterMatcher::new(llm, Arc::new(ParameterCatalog::load_default().unwrap()))
    }

    #[tokio::test]
    async fn test_accepts_allow_listed_key() {
        let llm = Arc::new(ScriptedLlm::new([r#"{"match": "block2_width"}"#]));
        let key = matcher(llm.clone())
            .match_key("increase block2 width", AgentDomain::Building)
            .await
            .unwrap();
        assert_eq!(key, "block2_width");

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("- block2_width"));
        assert!(!calls[0].0.contains("front_setback"));
        assert_eq!(calls[0].1, "increase block2 width");
    }

    #[tokio::test]
    async fn test_respelled_key_rejected() {
        let catalog = ParameterCatalog::load_default().unwrap();
        for reply in ["BLOCK2-WIDTH", "Block2 Width", "block2_Width"] {
            assert!(!catalog.is_valid_key(reply));
            let llm = Arc::new(ScriptedLlm::new([format!(r#"{{"match": "{}"}}"#, reply)]));
            let err = matcher(llm)
                .match_key("increase block2 width", AgentDomain::Building)
                .await
                .unwrap_err();
            assert!(matches!(err, FormIoError::InvalidParameter { ref key, .. } if key == reply));
        }
    }

    #[tokio::test]
    async fn test_surrounding_whitespace_trimmed() {
        let llm = Arc::new(ScriptedLlm::new([r#"{"match": " block2_width\n"}"#]));
        let key = matcher(llm)
            .match_key("increase block2 width", AgentDomain::Building)
            .await
            .unwrap();
        assert_eq!(key, "block2_width");
    }

    #[tokio::test]
    async fn test_rejects_unknown_key() {
        let llm = Arc::new(ScriptedLlm::new([r#"{"match": "unknown_key"}"#]));
        let err = matcher(llm)
            .match_key("increase block2 width", AgentDomain::Building)
            .await
            .unwrap_err();
        assert!(matches!(err, FormIoError::InvalidParameter { ref key, .. } if key == "unknown_key"));
        assert!(err.to_string().contains("Matched key is not a valid parameter"));
    }

    #[tokio::test]
    async fn test_rejects_key_from_other_domain() {
        let llm = Arc::new(ScriptedLlm::new([r#"{"match": "front_setback"}"#]));
        let err = matcher(llm)
            .match_key("increase block2 width", AgentDomain::Building)
            .await
            .unwrap_err();
        assert!(matches!(err, FormIoError::InvalidParameter { .. }));
    }

    #[tokio::test]
    async fn test_missing_match_field() {
        let llm = Arc::new(ScriptedLlm::new([r#"{"answer": "block2_width"}"#]));
        let err = matcher(llm)
            .match_key("increase block2 width", AgentDomain::Building)
            .await
            .unwrap_err();
        assert!(matches!(err, FormIoError::InvalidParameter { .. }));
    }

    #[tokio::test]
    async fn test_non_json_reply() {
        let llm = Arc::new(ScriptedLlm::new(["block2_width"]));
        let err = matcher(llm)
            .match_key("increase block2 width", AgentDomain::Building)
            .await
            .unwrap_err();
        assert!(matches!(err, FormIoError::ResponseFormat(_)));
    }

    #[tokio::test]
    async fn test_none_domain_makes_no_call() {
        let llm = Arc::new(ScriptedLlm::new([r#"{"match": "block2_width"}"#]));
        let err = matcher(llm.clone())
            .match_key("make it nicer", AgentDomain::None)
            .await
            .unwrap_err();
        assert!(matches!(err, FormIoError::Validation(_)));
        assert_eq!(llm.call_count(), 0);
    }
}
