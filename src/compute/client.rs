//! Rhino Compute client
//!
//! Posts solve and manifest requests to the geometry solver. Success bodies
//! are relayed as opaque JSON; failures keep the solver's status and body.

use serde::Serialize;
use tracing::{error, info};
use url::Url;

use super::payload::{IoRequest, SolveRequest};
use crate::error::{FormIoError, Result};
use crate::http::{ensure_success, send_with_retry, HttpSettings};

const SERVICE: &str = "Rhino Compute";

#[derive(Clone)]
pub struct ComputeClient {
    client: reqwest::Client,
    base_url: Url,
    settings: HttpSettings,
}

impl ComputeClient {
    pub fn new(base_url: Url, settings: HttpSettings) -> Result<Self> {
        let mut base_url = base_url;
        // Url::join replaces the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client: settings.build_client()?,
            base_url,
            settings,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Solve a definition with the given input trees
    pub async fn dispatch(&self, payload: &SolveRequest) -> Result<serde_json::Value> {
        info!(values = payload.values.len(), "Dispatching solve to Rhino Compute");
        self.post_json("grasshopper", payload).await
    }

    /// Ask the solver which inputs and outputs a definition exposes
    pub async fn fetch_manifest(&self, algo: String) -> Result<serde_json::Value> {
        info!("Requesting definition manifest from Rhino Compute");
        self.post_json("io", &IoRequest { algo, pointer: None }).await
    }

    async fn post_json<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<serde_json::Value> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| FormIoError::Config(format!("Invalid compute endpoint: {}", e)))?;

        let response = send_with_retry(SERVICE, &self.settings, || {
            self.client.post(url.clone()).json(body).send()
        })
        .await?;

        let response = ensure_success(response).await.map_err(|e| {
            if let FormIoError::Upstream { status, body } = &e {
                error!(status, body = %body, "Compute server error");
            }
            e
        })?;

        response.json().await.map_err(|e| {
            FormIoError::response_format(format!("{} returned a non-JSON body: {}", SERVICE, e))
        })
    }
}
