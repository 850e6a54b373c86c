//! Outbound HTTP plumbing shared by the language-model and compute clients
//!
//! Every outbound call gets an explicit timeout and a bounded retry on
//! transport failure. Upstream answers (any status) are never retried.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{FormIoError, Result};

/// Timeout and retry policy for outbound calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    /// Extra attempts after a transport failure
    pub transport_retries: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            transport_retries: 1,
        }
    }
}

impl HttpSettings {
    /// Build a reqwest client honouring the timeout
    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| FormIoError::Config(format!("Failed to build HTTP client: {}", e)))
    }
}

/// Send a request, retrying while the failure is retryable.
///
/// `send` is called once per attempt so the request body is rebuilt each time.
/// Whether another attempt is made is decided by `FormIoError::is_retryable`.
pub async fn send_with_retry<F, Fut>(
    service: &str,
    settings: &HttpSettings,
    mut send: F,
) -> Result<reqwest::Response>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = reqwest::Result<reqwest::Response>>,
{
    let mut attempt = 0;
    loop {
        let err = match send().await {
            Ok(response) => return Ok(response),
            Err(e) => FormIoError::transport(service, &e),
        };
        if !err.is_retryable() || attempt >= settings.transport_retries {
            return Err(err);
        }
        attempt += 1;
        warn!(service, attempt, error = %err, "Transport failure, retrying");
    }
}

/// Turn a non-success response into `Upstream`, keeping status and body verbatim
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!(status, error = %e, "Could not read upstream error body");
            format!("Upstream returned {} with an unreadable body", status)
        }
    };
    Err(FormIoError::Upstream { status, body })
}
