//! Error taxonomy for the relay.
//!
//! Every failure is translated exactly once into the uniform `{error}` JSON
//! envelope with an HTTP status; there is no local recovery or retry. Secrets
//! are masked before the message reaches a log line or a response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::redact;

pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// Errors that can occur while relaying a request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing or invalid environment configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed caller input, rejected before any upstream call
    #[error("{0}")]
    Validation(String),

    /// Private key is not in a supported encoding
    #[error("unsupported private key: {0}")]
    KeyFormat(String),

    /// Non-2xx response from the GitHub API
    #[error("GitHub API error ({status}): {body}")]
    Upstream { status: u16, body: String },

    /// 200-status error payload from the OAuth token endpoint
    #[error("GitHub OAuth error: {code} - {description}")]
    OAuth { code: String, description: String },

    /// Underlying cryptographic failure while signing the App JWT
    #[error("JWT signing failed: {0}")]
    Signing(String),

    /// Missing or rejected bearer credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Transport-level failure talking to the upstream (timeouts included)
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) | RelayError::OAuth { .. } => StatusCode::BAD_REQUEST,
            RelayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            RelayError::Config(_)
            | RelayError::KeyFormat(_)
            | RelayError::Upstream { .. }
            | RelayError::Signing(_)
            | RelayError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = redact::mask_secrets(&self.to_string());

        if status.is_server_error() {
            error!(status = status.as_u16(), "{message}");
        } else {
            warn!(status = status.as_u16(), "{message}");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            RelayError::Validation("bad id".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::OAuth {
                code: "access_denied".into(),
                description: String::new(),
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::Unauthorized("no header".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RelayError::Upstream {
                status: 404,
                body: "not found".into(),
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RelayError::Config("APP_ID is not set".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn oauth_error_message_carries_code_and_description() {
        let err = RelayError::OAuth {
            code: "access_denied".into(),
            description: "The user denied the request".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("access_denied"));
        assert!(msg.contains("denied the request"));
    }
}
