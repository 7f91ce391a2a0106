//! Error types for the actions gateway.
//!
//! Every pipeline stage short-circuits into [`Error`]; the `IntoResponse`
//! impl is the terminal handler that renders all failures uniformly as
//! `{ "message": ... }` with the mapped status and any challenge headers.

use std::io;

use axum::{
    Json,
    http::{StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;

/// Result type alias for the actions gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Actions gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bearer token missing or failed validation
    #[error("{0}")]
    Authentication(#[from] AuthError),

    /// Token is valid but lacks required scopes
    #[error("Insufficient scope: missing {}", .missing.join(", "))]
    Authorization {
        /// Required scopes absent from the caller's grants
        missing: Vec<String>,
    },

    /// Client-credentials exchange with the identity provider failed
    #[error("Upstream credential exchange failed: {0}")]
    UpstreamAuth(String),

    /// Management API collection fetch failed
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    /// Upstream payload had an unexpected shape
    #[error("Unexpected upstream data: {0}")]
    DataShape(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status this error renders with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization { .. } => StatusCode::FORBIDDEN,
            Self::UpstreamAuth(_) | Self::UpstreamFetch(_) | Self::DataShape(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// `WWW-Authenticate` challenge attached to 401/403 responses.
    fn challenge(&self) -> Option<String> {
        match self {
            Self::Authentication(e) => Some(format!(
                "Bearer error=\"invalid_token\", error_description=\"{e}\""
            )),
            Self::Authorization { .. } => {
                Some("Bearer error=\"insufficient_scope\"".to_string())
            }
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        } else {
            tracing::warn!(error = %self, status = %status, "Request rejected");
        }

        let body = Json(json!({ "message": self.to_string() }));
        match self.challenge() {
            Some(challenge) => (status, [(WWW_AUTHENTICATE, challenge)], body).into_response(),
            None => (status, body).into_response(),
        }
    }
}
