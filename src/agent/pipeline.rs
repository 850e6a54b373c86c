//! Chat Pipeline
//!
//! Drives one prompt through
//! `Received → Routed → Matched → Updated → Validated → Applied`.
//! Any stage failure moves the request to `Rejected` and ends it; there is
//! no retry across stages.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::matcher::ParameterMatcher;
use super::router::AgentRouter;
use super::updater::ParameterUpdater;
use crate::error::{FormIoError, Result};
use crate::llm::LlmClient;
use crate::parameters::{AgentDomain, ParamValue, ParameterCatalog, ParameterMap};

/// States of a prompt-to-update request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Received,
    Routed,
    Matched,
    Updated,
    Validated,
    Applied,
    Rejected,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Routed => "routed",
            PipelineStage::Matched => "matched",
            PipelineStage::Updated => "updated",
            PipelineStage::Validated => "validated",
            PipelineStage::Applied => "applied",
            PipelineStage::Rejected => "rejected",
        };
        write!(f, "{}", name)
    }
}

/// Result of a prompt that reached `Applied`
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub domain: AgentDomain,
    pub key: String,
    pub value: ParamValue,
    pub reasoning: String,
}

impl ChatOutcome {
    /// The single-key mapping handed back to the form
    pub fn parameters(&self) -> ParameterMap {
        ParameterMap::from([(self.key.clone(), self.value.clone())])
    }
}

pub struct ChatPipeline {
    catalog: Arc<ParameterCatalog>,
    router: AgentRouter,
    matcher: ParameterMatcher,
    updater: ParameterUpdater,
}

impl ChatPipeline {
    pub fn new(client: Arc<dyn LlmClient>, catalog: Arc<ParameterCatalog>) -> Self {
        Self {
            router: AgentRouter::new(catalog.clone()),
            matcher: ParameterMatcher::new(client.clone(), catalog.clone()),
            updater: ParameterUpdater::new(client, catalog.clone()),
            catalog,
        }
    }

    /// Run a prompt against the current inputs
    pub async fn run(&self, prompt: &str, current: &ParameterMap) -> Result<ChatOutcome> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(reject(
                PipelineStage::Received,
                FormIoError::validation("No prompt provided"),
            ));
        }
        info!(stage = %PipelineStage::Received, prompt_len = prompt.len(), "Prompt received");

        let domain = self.router.route(prompt);
        if !domain.is_routable() {
            return Err(reject(
                PipelineStage::Routed,
                FormIoError::validation(
                    "Prompt does not refer to a building, envelope or facade parameter",
                ),
            ));
        }
        info!(stage = %PipelineStage::Routed, %domain, "Prompt routed");

        let key = self
            .matcher
            .match_key(prompt, domain)
            .await
            .map_err(|e| reject(PipelineStage::Matched, e))?;

        let update = self
            .updater
            .propose_update(prompt, &key, current.get(&key))
            .await
            .map_err(|e| reject(PipelineStage::Updated, e))?;
        info!(stage = %PipelineStage::Updated, key = %key, "Update proposed");

        let value = self.validate(&key, update.value);
        info!(stage = %PipelineStage::Validated, key = %key, value = %value, "Value validated");

        info!(stage = %PipelineStage::Applied, key = %key, "Update applied");

        Ok(ChatOutcome {
            domain,
            key,
            value,
            reasoning: update.reasoning,
        })
    }

    /// Clamp numeric values into the catalog range
    fn validate(&self, key: &str, value: ParamValue) -> ParamValue {
        if let ParamValue::Numeric(number) = value {
            if let Some(spec) = self.catalog.spec_for(key) {
                let clamped = spec.clamp(number);
                if clamped != number {
                    warn!(key, proposed = number, clamped, "Proposed value outside range, clamped");
                }
                return ParamValue::Numeric(clamped);
            }
        }
        value
    }
}

fn reject(stage: PipelineStage, error: FormIoError) -> FormIoError {
    warn!(stage = %stage, next = %PipelineStage::Rejected, error = %error, "Prompt rejected");
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;

    fn pipeline(llm: Arc<ScriptedLlm>) -> ChatPipeline {
        ChatPipeline::new(llm, Arc::new(ParameterCatalog::load_default().unwrap()))
    }

    #[tokio::test]
    async fn test_block2_width_end_to_end() {
        let llm = Arc::new(ScriptedLlm::new([
            r#"{"match": "block2_width"}"#,
            r#"{"reasoning": "Deeper plan", "parameters": {"block2_width": "18000 mm"}}"#,
        ]));
        let mut current = ParameterMap::new();
        current.insert("block2_width".to_string(), 15000.0.into());
        current.insert("building_type".to_string(), "H-shaped".into());

        let outcome = pipeline(llm.clone())
            .run("increase block2 width", &current)
            .await
            .unwrap();

        assert_eq!(outcome.domain, AgentDomain::Building);
        assert_eq!(outcome.key, "block2_width");
        assert_eq!(outcome.value, ParamValue::Numeric(18000.0));
        assert_eq!(
            outcome.parameters(),
            ParameterMap::from([("block2_width".to_string(), ParamValue::Numeric(18000.0))])
        );
        assert_eq!(llm.call_count(), 2);
        assert!(llm.calls()[1].0.contains("Current value: 15000"));
    }

    #[tokio::test]
    async fn test_in_range_value_untouched() {
        let llm = Arc::new(ScriptedLlm::new([
            r#"{"match": "front_setback"}"#,
            r#"{"reasoning": "More room", "parameters": {"front_setback": 6000}}"#,
        ]));
        let outcome = pipeline(llm)
            .run("increase the front setback", &ParameterMap::new())
            .await
            .unwrap();
        assert_eq!(outcome.domain, AgentDomain::Envelope);
        assert_eq!(outcome.value, ParamValue::Numeric(6000.0));
        assert_eq!(outcome.reasoning, "More room");
    }

    #[tokio::test]
    async fn test_out_of_range_value_clamped() {
        let llm = Arc::new(ScriptedLlm::new([
            r#"{"match": "front_setback"}"#,
            r#"{"reasoning": "Much more room", "parameters": {"front_setback": 45000}}"#,
        ]));
        let outcome = pipeline(llm)
            .run("double the front setback", &ParameterMap::new())
            .await
            .unwrap();
        assert_eq!(outcome.value, ParamValue::Numeric(30000.0));
    }

    #[tokio::test]
    async fn test_empty_prompt_makes_no_calls() {
        let llm = Arc::new(ScriptedLlm::new([r#"{"match": "block2_width"}"#]));
        let err = pipeline(llm.clone())
            .run("   ", &ParameterMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FormIoError::Validation(_)));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unroutable_prompt_makes_no_calls() {
        let llm = Arc::new(ScriptedLlm::new([r#"{"match": "block2_width"}"#]));
        let err = pipeline(llm.clone())
            .run("make it nicer", &ParameterMap::new())
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_match_halts_before_update() {
        let llm = Arc::new(ScriptedLlm::new([
            r#"{"match": "unknown_key"}"#,
            r#"{"reasoning": "r", "parameters": {"unknown_key": 1}}"#,
        ]));
        let err = pipeline(llm.clone())
            .run("increase block2 width", &ParameterMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FormIoError::InvalidParameter { .. }));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let llm = Arc::new(ScriptedLlm::failing(FormIoError::Transport {
            service: "OpenAI".to_string(),
            message: "connection refused".to_string(),
        }));
        let err = pipeline(llm)
            .run("increase block2 width", &ParameterMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FormIoError::Transport { .. }));
    }
}
