//! Parameter allow-list and value normalization
//!
//! Everything that touches a parameter key or value goes through here
//! before it can reach the solver or the project store.

pub mod catalog;
pub mod value;

pub use catalog::{AgentDomain, DomainDefinition, ParameterCatalog, ParameterSpec};
pub use value::{clean_value, normalize_key, ParamValue};

use std::collections::BTreeMap;

use crate::error::{FormIoError, Result};

/// Flat parameter mapping as the form sends it
pub type ParameterMap = BTreeMap<String, ParamValue>;

/// Validate every key against the allow-list, clean every value and check
/// it against the catalog range.
///
/// Used for inputs that are about to be persisted; the first bad entry
/// fails the whole mapping so nothing partial is written.
pub fn sanitize_inputs(catalog: &ParameterCatalog, inputs: ParameterMap) -> Result<ParameterMap> {
    inputs
        .into_iter()
        .map(|(key, value)| {
            if !catalog.is_valid_key(&key) {
                return Err(FormIoError::unknown_parameter(key));
            }
            let value = clean_value(value);
            check_range(catalog, &key, &value)?;
            Ok((key, value))
        })
        .collect()
}

/// Reject a numeric value outside the key's catalog range.
///
/// Caller-supplied values are rejected rather than clamped; only model
/// proposals are clamped (see `ChatPipeline`). Text passes through.
pub fn check_range(catalog: &ParameterCatalog, key: &str, value: &ParamValue) -> Result<()> {
    let (ParamValue::Numeric(number), Some(spec)) = (value, catalog.spec_for(key)) else {
        return Ok(());
    };
    if spec.clamp(*number) == *number {
        return Ok(());
    }
    Err(FormIoError::validation(format!(
        "Value {} for '{}' is out of range, expected {}",
        number,
        key,
        spec.bounds_hint().unwrap_or_default()
    )))
}

/// Convert a JSON object from the form into a parameter mapping.
///
/// Scalars only; nested arrays, objects and nulls are rejected so a bad
/// field never reaches the solver as an empty branch.
pub fn inputs_from_json(value: &serde_json::Value) -> Result<ParameterMap> {
    let object = value
        .as_object()
        .ok_or_else(|| FormIoError::validation("Input data must be a JSON object"))?;

    object
        .iter()
        .map(|(key, raw)| {
            ParamValue::from_json(raw)
                .map(|value| (key.clone(), value))
                .ok_or_else(|| {
                    FormIoError::validation(format!("Input '{}' must be a number or a string", key))
                })
        })
        .collect()
}
