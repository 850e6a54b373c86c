//! Parameter Updater
//!
//! Second language-model call: ask for a new value for one already-matched
//! key. The reply's `parameters` mapping is cut down to that key, whatever
//! else the model volunteers.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{FormIoError, Result};
use crate::llm::{strip_code_fence, LlmClient};
use crate::parameters::{clean_value, ParamValue, ParameterCatalog};

/// Reply shape the updater asks for
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReply {
    pub reasoning: String,
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl UpdateReply {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(strip_code_fence(raw))
            .map_err(|e| FormIoError::response_format(format!("update reply: {}", e)))
    }
}

/// A cleaned value proposal for exactly one key
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedUpdate {
    pub key: String,
    pub value: ParamValue,
    pub reasoning: String,
}

pub struct ParameterUpdater {
    client: Arc<dyn LlmClient>,
    catalog: Arc<ParameterCatalog>,
}

impl ParameterUpdater {
    pub fn new(client: Arc<dyn LlmClient>, catalog: Arc<ParameterCatalog>) -> Self {
        Self { client, catalog }
    }

    /// Request a new value for `key`, optionally telling the model the current one
    pub async fn propose_update(
        &self,
        prompt: &str,
        key: &str,
        current: Option<&ParamValue>,
    ) -> Result<ProposedUpdate> {
        let spec = self
            .catalog
            .spec_for(key)
            .ok_or_else(|| FormIoError::invalid_parameter(key))?;

        let mut system_prompt = format!(
            r#"You are an expert in parametric design.
Update only the parameter "{key}" to satisfy the user's request.
Parameter description: {description}"#,
            description = if spec.description.is_empty() {
                "(none)"
            } else {
                spec.description.as_str()
            }
        );
        if let Some(bounds) = spec.bounds_hint() {
            system_prompt.push_str(&format!("\nAllowed range: {}", bounds));
        }
        if let Some(current) = current {
            system_prompt.push_str(&format!("\nCurrent value: {}", current));
        }
        system_prompt.push_str(&format!(
            r#"

Respond with a JSON object only, in exactly this shape:
{{"reasoning": "<one or two sentences>", "parameters": {{"{key}": <new value>}}}}
The parameters object must contain "{key}" and nothing else."#
        ));

        let raw = self.client.chat_json(&system_prompt, prompt).await?;
        debug!(key, reply = %raw, "Update reply");

        let mut reply = UpdateReply::parse(&raw)?;
        let raw_value = reply.parameters.remove(key).ok_or_else(|| {
            FormIoError::response_format(format!("reply does not update '{}'", key))
        })?;
        if !reply.parameters.is_empty() {
            let extras: Vec<&String> = reply.parameters.keys().collect();
            warn!(key, ?extras, "Discarding off-scope keys from update reply");
        }

        let value = ParamValue::from_json(&raw_value).ok_or_else(|| {
            FormIoError::response_format(format!(
                "value for '{}' is neither a number nor a string",
                key
            ))
        })?;
        let value = clean_value(value);

        // A bounded parameter is numeric; a text answer cannot be applied to it
        let bounded = spec.min.is_some() || spec.max.is_some();
        if bounded && !value.is_numeric() {
            return Err(FormIoError::response_format(format!(
                "value for '{}' is not numeric: {}",
                key, value
            )));
        }

        info!(key, value = %value, "Proposed update");
        Ok(ProposedUpdate {
            key: key.to_string(),
            value,
            reasoning: reply.reasoning,
        })
    }
}
