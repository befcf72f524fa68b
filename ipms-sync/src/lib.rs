//! Change-detection and server sync engine for the IPMS host application.
//!
//! The host application is a single-page app that keeps its business lists
//! (software copyrights, papers, patents) in local key-value storage and has
//! no server of its own. This crate retrofits authentication and server-backed
//! persistence onto it without touching its code.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Store**: observable key-value namespace standing in for local storage
//! - **Session**: bearer token and identity, mirrored into the store
//! - **Client**: the remote API (login, lists, uploads)
//! - **Classifier**: infers a list's kind from its first record
//! - **Attachments**: uploads inline `data:` files, keeps the returned URLs
//! - **Queue**: debounces host writes per key
//! - **Engine**: pull on load, push on change
//!
//! ## Sync Process
//!
//! 1. **Resume**: a stored token is probed; dead tokens sign the user out
//! 2. **Pull**: all kinds are fetched concurrently and written to the store
//! 3. **Observe**: host writes reach the change queue through the store
//! 4. **Debounce**: a burst of writes to one key collapses into one job
//! 5. **Push**: the list is normalized, attachments uploaded, list replaced
//!
//! # Example
//!
//! ```
//! use ipms_sync::{LocalStore, SyncConfig, SyncEngine};
//! use std::sync::Arc;
//!
//! let store = Arc::new(LocalStore::new());
//! let config = SyncConfig::with_base_url("http://localhost:8089");
//! let engine = SyncEngine::connect(config, store).unwrap();
//! assert!(!engine.session().is_authenticated());
//! ```

pub mod attachments;
mod classify;
pub mod client;
mod config;
mod engine;
mod error;
pub mod normalize;
pub mod queue;
pub mod session;
pub mod store;

pub use attachments::AttachmentConverter;
pub use classify::{classify, classify_record};
pub use client::{LoginResponse, RemoteApi, RemoteClient};
pub use config::SyncConfig;
pub use engine::{EngineHandle, PullReport, PulledList, ResumeOutcome, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use normalize::{normalize_list, normalize_record};
pub use queue::{ChangeQueue, PendingSync, PushJob};
pub use session::SessionStore;
pub use store::{LocalStore, StoreListener, SubscriptionId, WriteOrigin};

pub use ipms_types::{DataUrl, EntityKind, Record, RecordList, Session};
