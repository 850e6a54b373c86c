//! Error types for the form-io pipeline
//!
//! Every stage returns a typed `FormIoError`; the HTTP layer decides the
//! status code from the variant, so no stage needs to know about HTTP.

use std::fmt;

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, FormIoError>;

/// Main error type for prompt handling, payload shaping and persistence
#[derive(Error, Debug)]
pub enum FormIoError {
    /// Caller mistake: empty prompt, missing file name, malformed input data
    #[error("{0}")]
    Validation(String),

    /// A key that is not on the parameter allow-list reached a checkpoint
    #[error("{origin}: {key}")]
    InvalidParameter { key: String, origin: KeyOrigin },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Reply was not the structured JSON we asked for
    #[error("Invalid response format: {0}")]
    ResponseFormat(String),

    /// External service could not be reached (connect, timeout, reset)
    #[error("Transport error calling {service}: {message}")]
    Transport { service: String, message: String },

    /// External service answered with a non-success status
    #[error("{body}")]
    Upstream { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Where a rejected parameter key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Answered by the language model
    Matched,
    /// Sent by the caller in a form or save request
    Input,
}

impl fmt::Display for KeyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyOrigin::Matched => "Matched key is not a valid parameter",
            KeyOrigin::Input => "Unknown parameter",
        })
    }
}

impl FormIoError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn response_format(message: impl Into<String>) -> Self {
        Self::ResponseFormat(message.into())
    }

    /// Model-chosen key that failed the allow-list
    pub fn invalid_parameter(key: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.into(),
            origin: KeyOrigin::Matched,
        }
    }

    /// Caller-supplied key that failed the allow-list
    pub fn unknown_parameter(key: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.into(),
            origin: KeyOrigin::Input,
        }
    }

    /// Build a transport error from a reqwest failure.
    ///
    /// A request reqwest could not even build (bad URL, bad header) is a
    /// configuration error and never reaches the wire.
    pub fn transport(service: &str, err: &reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::Config(format!("Invalid request to {}: {}", service, err));
        }
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else {
            err.to_string()
        };
        Self::Transport {
            service: service.to_string(),
            message,
        }
    }

    /// True for failures worth one more attempt (never for upstream answers)
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// True when the caller supplied something unusable
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidParameter { .. })
    }
}
