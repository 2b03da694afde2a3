//! Error types for deployd

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

use crate::models::deploy::DeployKind;

/// Main error type for deployd
///
/// Client-facing variants render their message verbatim so callers see the
/// exact validation text.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Another deploy already holds the target's event
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DeployError::Validation(_) => StatusCode::BAD_REQUEST,
            DeployError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DeployError::Forbidden(_) => StatusCode::FORBIDDEN,
            DeployError::NotFound(_) => StatusCode::NOT_FOUND,
            DeployError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller may simply try again later
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeployError::Conflict(_))
    }
}

impl From<anyhow::Error> for DeployError {
    fn from(err: anyhow::Error) -> Self {
        DeployError::Internal(err.to_string())
    }
}

impl IntoResponse for DeployError {
    fn into_response(self) -> Response {
        (self.status_code(), format!("{}\n", self)).into_response()
    }
}

/// Failure of a build or release backend
///
/// Recorded on the event and streamed to the caller, never turned into a
/// transport error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("{0}")]
    Failed(String),

    #[error("deploy canceled by the client")]
    Canceled,

    #[error("no builder registered for deploy kind {0}")]
    NoBuilder(DeployKind),

    #[error("builder returned version v{version} before its base image was committed")]
    Uncommitted { version: u32 },
}

impl From<DeployError> for BuildError {
    fn from(err: DeployError) -> Self {
        match err {
            DeployError::Build(inner) => inner,
            other => BuildError::Failed(other.to_string()),
        }
    }
}
