//! Control-plane client error types.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for control-plane calls.
pub type ControlPlaneResult<T> = Result<T, ControlPlaneError>;

/// Errors that can occur talking to the control plane.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    Request(#[from] http::Error),

    #[error("{method} {path} timed out after {timeout:?}")]
    Timeout {
        method: http::Method,
        path: String,
        timeout: Duration,
    },

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ControlPlaneError {
    /// Whether the control plane rejected a create because the name is taken.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ControlPlaneError::AlreadyExists(_))
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ControlPlaneError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Network-level failure; the next tick may well succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ControlPlaneError::Connect { .. }
                | ControlPlaneError::Http(_)
                | ControlPlaneError::Timeout { .. }
        ) || matches!(self, ControlPlaneError::Status { status, .. } if *status >= 500)
    }
}
