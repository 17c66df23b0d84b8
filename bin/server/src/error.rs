//! Error types for the server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;
use std::path::PathBuf;

/// Errors that stop the server from starting.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration is missing or invalid.
    Config { reason: String },
    /// The instructions file could not be read.
    Instructions { path: PathBuf, reason: String },
    /// The relay client could not be built.
    Relay { reason: String },
    /// Outbound credentials could not be built.
    Credential { reason: String },
    /// The listener could not be bound or the server stopped with an error.
    Serve { reason: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
            Self::Instructions { path, reason } => {
                write!(
                    f,
                    "failed to read instructions from '{}': {reason}",
                    path.display()
                )
            }
            Self::Relay { reason } => write!(f, "failed to build relay client: {reason}"),
            Self::Credential { reason } => write!(f, "failed to build credentials: {reason}"),
            Self::Serve { reason } => write!(f, "server error: {reason}"),
        }
    }
}

impl std::error::Error for StartupError {}

/// Errors returned to the platform from the activity endpoint.
#[derive(Debug)]
pub enum ApiError {
    /// The request body is not a valid activity.
    InvalidActivity(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidActivity(msg) => {
                tracing::warn!("Rejected activity: {}", msg);
                (StatusCode::BAD_REQUEST, "Invalid activity")
            }
        };

        (status, message).into_response()
    }
}
