//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
///
/// Only the explicit user actions (login, password change) surface these.
/// Background pull and push degrade to empty results and log instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Bad credentials at login.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Operation needs a session and there is none.
    #[error("authentication required")]
    AuthRequired,

    /// Server rejected the bearer token.
    #[error("session expired")]
    TokenExpired,

    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Server rejected the request payload (e.g. wrong old password).
    #[error("{0}")]
    Validation(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local store error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Attachment upload failed.
    #[error("upload failed: {0}")]
    Upload(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No async runtime available to schedule work on.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.status().is_some_and(|s| s.as_u16() == 401) {
            SyncError::TokenExpired
        } else {
            SyncError::Network(e.to_string())
        }
    }
}

impl From<ipms_types::Error> for SyncError {
    fn from(e: ipms_types::Error) -> Self {
        match e {
            ipms_types::Error::Serialization(e) => SyncError::Serialization(e),
            ipms_types::Error::InvalidDataUrl(msg) => SyncError::Upload(msg),
            ipms_types::Error::UnknownKind(kind) => {
                SyncError::Config(format!("unknown entity kind: {kind}"))
            }
        }
    }
}

impl SyncError {
    /// Returns true if the error means the session should be dropped.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, SyncError::TokenExpired | SyncError::AuthRequired)
    }
}
