//! Application configuration
//!
//! All settings come from the environment (a `.env` file is loaded first by
//! the binary). Lookups go through a closure so tests never touch the real
//! process environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{FormIoError, Result};
use crate::http::HttpSettings;
use crate::llm::backend::AgentBackend;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_DEFINITIONS_DIR: &str = "grasshopper_files";
const DEFAULT_COMPUTE_URL: &str = "http://localhost:6001";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TRANSPORT_RETRIES: u32 = 1;

/// Language-model provider settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: AgentBackend,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
}

/// Complete process configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding Grasshopper definitions (`.gh` / `.ghx`)
    pub definitions_dir: PathBuf,
    /// Rhino Compute base URL
    pub compute_url: Url,
    pub static_dir: Option<PathBuf>,
    /// Override for the embedded parameter catalog
    pub catalog_path: Option<PathBuf>,
    pub http: HttpSettings,
    pub llm: LlmConfig,
    pub database_url: Option<String>,
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind_addr = get("FORM_IO_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| FormIoError::Config(format!("FORM_IO_BIND_ADDR: {}", e)))?;

        let compute_url = get("FORM_IO_COMPUTE_URL")
            .unwrap_or_else(|| DEFAULT_COMPUTE_URL.to_string());
        let compute_url = Url::parse(&compute_url)
            .map_err(|e| FormIoError::Config(format!("FORM_IO_COMPUTE_URL: {}", e)))?;

        let timeout_secs = parse_number("FORM_IO_HTTP_TIMEOUT_SECS", get("FORM_IO_HTTP_TIMEOUT_SECS"))?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(FormIoError::Config(
                "FORM_IO_HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        let transport_retries =
            parse_number("FORM_IO_TRANSPORT_RETRIES", get("FORM_IO_TRANSPORT_RETRIES"))?
                .unwrap_or(DEFAULT_TRANSPORT_RETRIES);

        let backend = get("AGENT_BACKEND")
            .map(|value| value.parse::<AgentBackend>())
            .transpose()?
            .unwrap_or_default();
        let llm = LlmConfig {
            backend,
            api_key: get(backend.api_key_var()),
            model: get(backend.model_var()).unwrap_or_else(|| backend.default_model().to_string()),
            base_url: get(backend.base_url_var()),
        };

        Ok(Self {
            bind_addr,
            definitions_dir: get("FORM_IO_DEFINITIONS_DIR")
                .unwrap_or_else(|| DEFAULT_DEFINITIONS_DIR.to_string())
                .into(),
            compute_url,
            static_dir: get("FORM_IO_STATIC_DIR").map(PathBuf::from),
            catalog_path: get("FORM_IO_CATALOG_PATH").map(PathBuf::from),
            http: HttpSettings {
                timeout: Duration::from_secs(timeout_secs),
                transport_retries,
            },
            llm,
            database_url: get("DATABASE_URL"),
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: Option<String>) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| FormIoError::Config(format!("{}: {}", key, e)))
        })
        .transpose()
}
