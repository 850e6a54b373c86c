//! Project records
//!
//! Geometry fields (`site_bounds`, `site_envelope`, `blocks_envelope`,
//! `relative_location`) are opaque JSON: drawn polylines and polygons from
//! the map view that are stored and returned untouched.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FormIoError, Result};
use crate::parameters::{sanitize_inputs, ParameterCatalog, ParameterMap};

/// Project category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::Type))]
#[cfg_attr(feature = "database", sqlx(type_name = "VARCHAR", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    #[default]
    Residential,
    Acoustic,
    Urban,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Residential => "residential",
            ProjectType::Acoustic => "acoustic",
            ProjectType::Urban => "urban",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = FormIoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "residential" => Ok(ProjectType::Residential),
            "acoustic" => Ok(ProjectType::Acoustic),
            "urban" => Ok(ProjectType::Urban),
            other => Err(FormIoError::validation(format!(
                "Unknown project type '{}'. Valid values: residential, acoustic, urban",
                other
            ))),
        }
    }
}

pub(crate) fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub relative_location: serde_json::Value,
    pub site_bounds: serde_json::Value,
    pub site_envelope: serde_json::Value,
    pub blocks_envelope: serde_json::Value,
    pub inputs: ParameterMap,
    pub map_style: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Build a fresh record from a creation request
    pub fn from_new(new: NewProject) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name.trim().to_string(),
            project_type: new.project_type,
            relative_location: new.relative_location,
            site_bounds: new.site_bounds,
            site_envelope: new.site_envelope,
            blocks_envelope: new.blocks_envelope,
            inputs: new.inputs,
            map_style: new.map_style,
            created_at: Utc::now(),
        }
    }

    /// Apply a partial save; absent fields keep their stored value
    pub fn apply(&mut self, patch: SaveInputs) {
        if let Some(inputs) = patch.inputs {
            self.inputs = inputs;
        }
        if let Some(site_bounds) = patch.site_bounds {
            self.site_bounds = site_bounds;
        }
        if let Some(site_envelope) = patch.site_envelope {
            self.site_envelope = site_envelope;
        }
        if let Some(blocks_envelope) = patch.blocks_envelope {
            self.blocks_envelope = blocks_envelope;
        }
        if let Some(map_style) = patch.map_style {
            self.map_style = Some(map_style);
        }
    }
}

/// Creation request
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(rename = "type", default)]
    pub project_type: ProjectType,
    #[serde(default = "empty_object")]
    pub relative_location: serde_json::Value,
    #[serde(default = "empty_object")]
    pub site_bounds: serde_json::Value,
    #[serde(default = "empty_object")]
    pub site_envelope: serde_json::Value,
    #[serde(default = "empty_object")]
    pub blocks_envelope: serde_json::Value,
    #[serde(default)]
    pub inputs: ParameterMap,
    #[serde(default)]
    pub map_style: Option<String>,
}

impl NewProject {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project_type: ProjectType::default(),
            relative_location: empty_object(),
            site_bounds: empty_object(),
            site_envelope: empty_object(),
            blocks_envelope: empty_object(),
            inputs: ParameterMap::new(),
            map_style: None,
        }
    }

    /// Check the name and run inputs through the allow-list
    pub fn sanitize(mut self, catalog: &ParameterCatalog) -> Result<Self> {
        if self.name.trim().is_empty() {
            return Err(FormIoError::validation("Project name is required"));
        }
        self.inputs = sanitize_inputs(catalog, self.inputs)?;
        Ok(self)
    }
}

/// Partial update sent by the form's save button
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveInputs {
    #[serde(default)]
    pub inputs: Option<ParameterMap>,
    #[serde(default)]
    pub site_bounds: Option<serde_json::Value>,
    #[serde(default)]
    pub site_envelope: Option<serde_json::Value>,
    #[serde(default)]
    pub blocks_envelope: Option<serde_json::Value>,
    #[serde(default)]
    pub map_style: Option<String>,
}

impl SaveInputs {
    pub fn is_empty(&self) -> bool {
        self.inputs.is_none()
            && self.site_bounds.is_none()
            && self.site_envelope.is_none()
            && self.blocks_envelope.is_none()
            && self.map_style.is_none()
    }

    /// Reject empty saves and keys off the allow-list; clean input values
    pub fn sanitize(mut self, catalog: &ParameterCatalog) -> Result<Self> {
        if self.is_empty() {
            return Err(FormIoError::validation(
                "Nothing to save: expected inputs, site_bounds, site_envelope, blocks_envelope or map_style",
            ));
        }
        if let Some(inputs) = self.inputs.take() {
            self.inputs = Some(sanitize_inputs(catalog, inputs)?);
        }
        Ok(self)
    }
}
