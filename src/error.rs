//! Error types shared by the client, the reconciliation helpers and modules.

use std::time::Duration;
use thiserror::Error;

/// Error returned by the Linode API for a non-2xx response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{status}] {}", .errors.join("; "))]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// Error reasons reported by the API (`field: reason` when a field is given)
    pub errors: Vec<String>,
}

impl ApiError {
    pub fn new(status: u16, errors: Vec<String>) -> Self {
        Self { status, errors }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid parameters: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Timed out after {}s waiting for {condition}", .waited.as_secs())]
    PollTimeout { waited: Duration, condition: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected API response: {0}")]
    InvalidResponse(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True when the provider answered with the given HTTP status.
    pub fn has_status(&self, status: u16) -> bool {
        matches!(self, Error::Api(err) if err.status == status)
    }

    pub fn is_poll_timeout(&self) -> bool {
        matches!(self, Error::PollTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
