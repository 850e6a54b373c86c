//! HTTP error responses
//!
//! Maps `FormIoError` variants to status codes. Solver and project routes
//! answer `{"success": false, "error": ...}`; chat and manifest routes answer
//! `{"error": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::FormIoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Envelope {
    Plain,
    SuccessFlag,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    envelope: Envelope,
}

impl ApiError {
    /// `{"error": ...}` body
    pub fn plain(err: FormIoError) -> Self {
        Self::from_error(err, Envelope::Plain)
    }

    /// `{"success": false, "error": ...}` body
    pub fn with_success_flag(err: FormIoError) -> Self {
        Self::from_error(err, Envelope::SuccessFlag)
    }

    /// Chat failures are either the caller's fault or ours
    pub fn chat(err: FormIoError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, err.to_string(), Envelope::Plain)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Keep the envelope and message, answer with `status` instead
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    fn from_error(err: FormIoError, envelope: Envelope) -> Self {
        Self::new(status_for(&err), err.to_string(), envelope)
    }

    fn new(status: StatusCode, message: String, envelope: Envelope) -> Self {
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "Request failed");
        }
        Self {
            status,
            message,
            envelope,
        }
    }
}

/// Status code for an error variant
pub fn status_for(err: &FormIoError) -> StatusCode {
    match err {
        FormIoError::Validation(_) | FormIoError::InvalidParameter { .. } => {
            StatusCode::BAD_REQUEST
        }
        FormIoError::NotFound(_) => StatusCode::NOT_FOUND,
        FormIoError::Conflict(_) => StatusCode::CONFLICT,
        FormIoError::Upstream { status, .. } => StatusCode::from_u16(*status)
            .ok()
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.envelope {
            Envelope::Plain => json!({ "error": self.message }),
            Envelope::SuccessFlag => json!({ "success": false, "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&FormIoError::validation("x")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&FormIoError::invalid_parameter("x")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&FormIoError::not_found("x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&FormIoError::Conflict("x".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&FormIoError::response_format("x")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_status_relayed() {
        let err = FormIoError::Upstream {
            status: 422,
            body: "bad tree".to_string(),
        };
        assert_eq!(status_for(&err), StatusCode::UNPROCESSABLE_ENTITY);

        let odd = FormIoError::Upstream {
            status: 302,
            body: String::new(),
        };
        assert_eq!(status_for(&odd), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_chat_collapses_to_500() {
        let err = ApiError::chat(FormIoError::Upstream {
            status: 429,
            body: "rate limited".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ApiError::chat(FormIoError::validation("No prompt provided"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_with_status_overrides_code() {
        let err = ApiError::with_success_flag(FormIoError::validation("Only POST method allowed."))
            .with_status(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.message, "Only POST method allowed.");
        assert_eq!(err.envelope, Envelope::SuccessFlag);
    }
}
