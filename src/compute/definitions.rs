//! Grasshopper definition store
//!
//! Definitions live in one configured directory and are addressed by file
//! name only. Names that would leave the directory are treated as not found.

use std::path::{Component, Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use crate::error::{FormIoError, Result};

#[derive(Debug, Clone)]
pub struct DefinitionStore {
    dir: PathBuf,
}

impl DefinitionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolve a definition name to an existing file inside the store
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FormIoError::validation("No Grasshopper file name provided"));
        }

        let relative = Path::new(name);
        let stays_inside = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        let path = self.dir.join(relative);
        if !stays_inside || !path.is_file() {
            return Err(FormIoError::not_found(format!("File {} not found.", name)));
        }
        Ok(path)
    }

    /// Read a definition and base64-encode it for transport
    pub async fn encode_algorithm(&self, name: &str) -> Result<String> {
        let path = self.resolve(name)?;
        let bytes = tokio::fs::read(&path).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "Encoded definition");
        Ok(STANDARD.encode(bytes))
    }
}
