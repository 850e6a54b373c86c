//! Rhino Compute payload shaping
//!
//! Grasshopper expects every input as a data tree. We send one branch per
//! parameter at path `{0;0}` holding a single item whose `type` names the
//! .NET type. Internally a value is a `TreeItem`; the wire type strings only
//! exist in its serde attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FormIoError, Result};
use crate::parameters::{check_range, clean_value, ParamValue, ParameterCatalog, ParameterMap};

/// Branch path used for every single-valued parameter
pub const BRANCH_PATH: &str = "{0;0}";

/// One item of a data-tree branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TreeItem {
    #[serde(rename = "System.Double")]
    Numeric(f64),
    #[serde(rename = "System.String")]
    Text(String),
}

impl From<ParamValue> for TreeItem {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Numeric(n) => TreeItem::Numeric(n),
            ParamValue::Text(s) => TreeItem::Text(s),
        }
    }
}

/// A named Grasshopper input and its tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTree {
    #[serde(rename = "ParamName")]
    pub param_name: String,
    #[serde(rename = "InnerTree")]
    pub inner_tree: BTreeMap<String, Vec<TreeItem>>,
}

impl DataTree {
    /// Single-branch tree holding one value
    pub fn single(param_name: impl Into<String>, item: TreeItem) -> Self {
        Self {
            param_name: param_name.into(),
            inner_tree: BTreeMap::from([(BRANCH_PATH.to_string(), vec![item])]),
        }
    }
}

/// Body of a `/grasshopper` solve request
#[derive(Debug, Clone, Serialize)]
pub struct SolveRequest {
    /// Base64-encoded definition
    pub algo: String,
    pub pointer: Option<String>,
    pub values: Vec<DataTree>,
}

/// Body of an `/io` manifest request
#[derive(Debug, Clone, Serialize)]
pub struct IoRequest {
    pub algo: String,
    pub pointer: Option<String>,
}

/// Convert a flat mapping into one tree per parameter.
///
/// Keys off the allow-list and numbers outside the catalog range fail the
/// whole build; nothing is dropped or clamped.
pub fn build_tree(catalog: &ParameterCatalog, inputs: &ParameterMap) -> Result<Vec<DataTree>> {
    inputs
        .iter()
        .map(|(key, value)| {
            if !catalog.is_valid_key(key) {
                return Err(FormIoError::unknown_parameter(key.as_str()));
            }
            let value = clean_value(value.clone());
            check_range(catalog, key, &value)?;
            Ok(DataTree::single(key.as_str(), value.into()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> ParameterCatalog {
        ParameterCatalog::load_default().unwrap()
    }

    #[test]
    fn test_two_branches_typed() {
        let mut inputs = ParameterMap::new();
        inputs.insert("podium_length".to_string(), 45000.0.into());
        inputs.insert("building_type".to_string(), "H-shaped".into());

        let trees = build_tree(&catalog(), &inputs).unwrap();
        assert_eq!(trees.len(), 2);

        let podium = trees.iter().find(|t| t.param_name == "podium_length").unwrap();
        assert_eq!(podium.inner_tree[BRANCH_PATH], vec![TreeItem::Numeric(45000.0)]);

        let building = trees.iter().find(|t| t.param_name == "building_type").unwrap();
        assert_eq!(
            building.inner_tree[BRANCH_PATH],
            vec![TreeItem::Text("H-shaped".to_string())]
        );
    }

    #[test]
    fn test_wire_format() {
        let tree = DataTree::single("podium_length", TreeItem::Numeric(45000.0));
        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!({
                "ParamName": "podium_length",
                "InnerTree": {"{0;0}": [{"type": "System.Double", "data": 45000.0}]}
            })
        );

        let request = SolveRequest {
            algo: "ZGVm".to_string(),
            pointer: None,
            values: vec![DataTree::single("building_type", TreeItem::Text("L".into()))],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "algo": "ZGVm",
                "pointer": null,
                "values": [{
                    "ParamName": "building_type",
                    "InnerTree": {"{0;0}": [{"type": "System.String", "data": "L"}]}
                }]
            })
        );
    }

    #[test]
    fn test_unit_strings_sent_as_numbers() {
        let mut inputs = ParameterMap::new();
        inputs.insert("floor_height".to_string(), "3500 mm".into());
        let trees = build_tree(&catalog(), &inputs).unwrap();
        assert_eq!(trees[0].inner_tree[BRANCH_PATH], vec![TreeItem::Numeric(3500.0)]);
    }

    #[test]
    fn test_out_of_range_fails_build() {
        let mut inputs = ParameterMap::new();
        inputs.insert("floor_height".to_string(), "3.5 m".into());
        let err = build_tree(&catalog(), &inputs).unwrap_err();
        assert!(matches!(err, FormIoError::Validation(ref m) if m.contains("floor_height")));
    }

    #[test]
    fn test_unknown_key_fails_build() {
        let mut inputs = ParameterMap::new();
        inputs.insert("podium_length".to_string(), 45000.0.into());
        inputs.insert("podium_lenght".to_string(), 45000.0.into());
        let err = build_tree(&catalog(), &inputs).unwrap_err();
        assert!(matches!(err, FormIoError::InvalidParameter { key, .. } if key == "podium_lenght"));
    }

    #[test]
    fn test_branch_count_matches_inputs() {
        let catalog = catalog();
        let inputs: ParameterMap = catalog
            .keys_for(crate::parameters::AgentDomain::Facade)
            .into_iter()
            .enumerate()
            .map(|(i, key)| {
                let value = if i % 2 == 0 {
                    let lowest = catalog.spec_for(key).and_then(|spec| spec.min);
                    ParamValue::Numeric(lowest.unwrap_or(i as f64))
                } else {
                    ParamValue::Text(format!("option-{}", i))
                };
                (key.to_string(), value)
            })
            .collect();

        let trees = build_tree(&catalog, &inputs).unwrap();
        assert_eq!(trees.len(), inputs.len());
        for tree in &trees {
            let item = &tree.inner_tree[BRANCH_PATH][0];
            assert_eq!(
                matches!(item, TreeItem::Numeric(_)),
                inputs[&tree.param_name].is_numeric()
            );
        }
    }
}
