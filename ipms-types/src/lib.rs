//! Core type definitions for IPMS sync.
//!
//! This crate defines the data model shared by the sync
//! engine and its tooling:
//! - Records and record lists as cached by the host application
//! - Entity kinds inferred from record shape
//! - The authenticated session
//! - Inline data-URL file payloads
//!
//! Nothing here performs I/O.

mod data_url;
mod kind;
mod record;
mod session;

pub use data_url::{DataUrl, DATA_URL_MARKER};
pub use kind::EntityKind;
pub use record::{is_truthy, Record, RecordList};
pub use session::Session;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid data url: {0}")]
    InvalidDataUrl(String),

    #[error("unknown entity kind: {0}")]
    UnknownKind(String),
}
