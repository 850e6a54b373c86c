//! Parameter values and normalization
//!
//! Values arrive from the form as JSON numbers or strings and from the
//! language model as loosely typed JSON. `clean_value` turns "8 m" into 8.0
//! and leaves genuinely textual values such as "courtyard" alone.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number followed by an optional unit marker, nothing else
static UNIT_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:e[-+]?\d+)?)\s*(mm|cm|km|m|ft|in|deg|°|%|floors?|storeys?|stories)?\.?\s*$",
    )
    .expect("unit regex is valid")
});

/// A parameter value: numeric or textual, nothing else
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Numeric(f64),
    Text(String),
}

impl ParamValue {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ParamValue::Numeric(_))
    }

    /// Convert a loosely typed JSON value from the language model.
    ///
    /// Booleans map to 1/0 (Grasshopper toggles are numeric); arrays, objects
    /// and null have no parameter representation.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(ParamValue::Numeric),
            serde_json::Value::String(s) => Some(ParamValue::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(ParamValue::Numeric(if *b { 1.0 } else { 0.0 })),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Numeric(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Numeric(n) => write!(f, "{}", n),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Strip a trailing unit marker and parse; anything unparseable is returned
/// unchanged. Never fails.
pub fn clean_value(raw: ParamValue) -> ParamValue {
    match raw {
        ParamValue::Numeric(_) => raw,
        ParamValue::Text(text) => match parse_with_unit(&text) {
            Some(number) => ParamValue::Numeric(number),
            None => ParamValue::Text(text),
        },
    }
}

fn parse_with_unit(text: &str) -> Option<f64> {
    let captures = UNIT_VALUE.captures(text)?;
    let number: f64 = captures.get(1)?.as_str().parse().ok()?;
    number.is_finite().then_some(number)
}

/// Format normalization for keys coming from free text ("Block2 Width",
/// "block-2-width"). The allow-list check itself stays exact.
pub fn normalize_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        let c = if c == ' ' || c == '-' { '_' } else { c };
        if c == '_' && key.ends_with('_') {
            continue;
        }
        key.extend(c.to_lowercase());
    }
    key.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_value_strips_units() {
        assert_eq!(clean_value("8 m".into()), ParamValue::Numeric(8.0));
        assert_eq!(clean_value("4500mm".into()), ParamValue::Numeric(4500.0));
        assert_eq!(clean_value(" 12.5 % ".into()), ParamValue::Numeric(12.5));
        assert_eq!(clean_value("30°".into()), ParamValue::Numeric(30.0));
        assert_eq!(clean_value("6 floors".into()), ParamValue::Numeric(6.0));
        assert_eq!(clean_value("-3.5".into()), ParamValue::Numeric(-3.5));
    }

    #[test]
    fn test_clean_value_leaves_text() {
        assert_eq!(
            clean_value("courtyard".into()),
            ParamValue::Text("courtyard".to_string())
        );
        assert_eq!(
            clean_value("H-shaped".into()),
            ParamValue::Text("H-shaped".to_string())
        );
        assert_eq!(
            clean_value("8 metres wide".into()),
            ParamValue::Text("8 metres wide".to_string())
        );
        assert_eq!(clean_value("".into()), ParamValue::Text(String::new()));
    }

    #[test]
    fn test_clean_value_numeric_passthrough() {
        assert_eq!(clean_value(45000.0.into()), ParamValue::Numeric(45000.0));
    }

    #[test]
    fn test_clean_value_idempotent() {
        let samples = [
            ParamValue::from("8 m"),
            ParamValue::from("courtyard"),
            ParamValue::from("1e3mm"),
            ParamValue::from("  "),
            ParamValue::Numeric(3.25),
            ParamValue::from("12,5 m"),
        ];
        for sample in samples {
            let once = clean_value(sample.clone());
            let twice = clean_value(once.clone());
            assert_eq!(once, twice, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Block2 Width"), "block2_width");
        assert_eq!(normalize_key(" podium-length "), "podium_length");
        assert_eq!(normalize_key("floor__height"), "floor_height");
        assert_eq!(normalize_key("_detail_mode_"), "detail_mode");
    }

    #[test]
    fn test_from_json() {
        assert_eq!(
            ParamValue::from_json(&serde_json::json!(3)),
            Some(ParamValue::Numeric(3.0))
        );
        assert_eq!(
            ParamValue::from_json(&serde_json::json!("brick")),
            Some(ParamValue::Text("brick".to_string()))
        );
        assert_eq!(
            ParamValue::from_json(&serde_json::json!(true)),
            Some(ParamValue::Numeric(1.0))
        );
        assert_eq!(ParamValue::from_json(&serde_json::json!(null)), None);
        assert_eq!(ParamValue::from_json(&serde_json::json!([1, 2])), None);
    }

    #[test]
    fn test_untagged_serde() {
        let values: std::collections::BTreeMap<String, ParamValue> =
            serde_json::from_str(r#"{"podium_length": 45000, "building_type": "H-shaped"}"#)
                .unwrap();
        assert_eq!(values["podium_length"], ParamValue::Numeric(45000.0));
        assert_eq!(
            values["building_type"],
            ParamValue::Text("H-shaped".to_string())
        );
    }
}
