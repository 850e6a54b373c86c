//! Geometry solver dispatch
//!
//! ```text
//! inputs → build_tree → SolveRequest{algo: base64(definition)} → Rhino Compute
//! ```

pub mod client;
pub mod definitions;
pub mod payload;

pub use client::ComputeClient;
pub use definitions::DefinitionStore;
pub use payload::{build_tree, DataTree, SolveRequest, TreeItem, BRANCH_PATH};

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::parameters::{ParameterCatalog, ParameterMap};

/// Builds solver payloads from definitions and flat inputs
pub struct ComputePayloadBuilder {
    catalog: Arc<ParameterCatalog>,
    definitions: DefinitionStore,
}

impl ComputePayloadBuilder {
    pub fn new(catalog: Arc<ParameterCatalog>, definitions: DefinitionStore) -> Self {
        Self {
            catalog,
            definitions,
        }
    }

    pub fn build_tree(&self, inputs: &ParameterMap) -> Result<Vec<DataTree>> {
        build_tree(&self.catalog, inputs)
    }

    pub async fn encode_algorithm(&self, name: &str) -> Result<String> {
        self.definitions.encode_algorithm(name).await
    }

    /// Validate inputs before touching the file system, then encode
    pub async fn build_request(&self, name: &str, inputs: &ParameterMap) -> Result<SolveRequest> {
        let values = self.build_tree(inputs)?;
        let algo = self.encode_algorithm(name).await?;
        Ok(SolveRequest {
            algo,
            pointer: None,
            values,
        })
    }
}

/// Payload builder plus solver client, as the HTTP layer uses them
pub struct ComputeService {
    builder: ComputePayloadBuilder,
    client: ComputeClient,
}

impl ComputeService {
    pub fn new(builder: ComputePayloadBuilder, client: ComputeClient) -> Self {
        Self { builder, client }
    }

    /// Solve `name` with `inputs`, relaying the solver's JSON
    pub async fn solve(&self, name: &str, inputs: &ParameterMap) -> Result<serde_json::Value> {
        info!(definition = name, inputs = inputs.len(), "Solve requested");
        let request = self.builder.build_request(name, inputs).await?;
        self.client.dispatch(&request).await
    }

    /// Input/output manifest of definition `name`
    pub async fn manifest(&self, name: &str) -> Result<serde_json::Value> {
        let algo = self.builder.encode_algorithm(name).await?;
        self.client.fetch_manifest(algo).await
    }
}
