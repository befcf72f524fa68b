//! Engine configuration.

use crate::session::{AUTH_TOKEN_KEY, AUTH_USER_KEY};
use ipms_types::EntityKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the sync engine and its remote client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the IPMS API server (e.g. `http://localhost:8089`).
    pub api_base_url: String,
    /// Debounce quiet period after the last write to a key (ms).
    pub quiet_period_ms: u64,
    /// Timeout for a single HTTP request (ms).
    pub request_timeout_ms: u64,
    /// Keys never synchronized regardless of content.
    pub reserved_keys: Vec<String>,
    /// Prefix of host diagnostics keys, never synchronized.
    pub diagnostic_prefix: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8089".to_string(),
            quiet_period_ms: 1_000,
            request_timeout_ms: 30_000,
            reserved_keys: vec![AUTH_TOKEN_KEY.to_string(), AUTH_USER_KEY.to_string()],
            diagnostic_prefix: "debug_".to_string(),
        }
    }
}

impl SyncConfig {
    /// Creates a config pointing at the given server with default tuning.
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Default::default()
        }
    }

    /// Debounce quiet period.
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    /// HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Returns true if writes to this key must never be synchronized.
    pub fn is_reserved_key(&self, key: &str) -> bool {
        (!self.diagnostic_prefix.is_empty() && key.starts_with(&self.diagnostic_prefix))
            || self.reserved_keys.iter().any(|k| k == key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }

    pub(crate) fn login_url(&self) -> String {
        self.url("/api/auth/login")
    }

    pub(crate) fn logout_url(&self) -> String {
        self.url("/api/auth/logout")
    }

    pub(crate) fn password_url(&self) -> String {
        self.url("/api/auth/password")
    }

    pub(crate) fn check_url(&self) -> String {
        self.url("/api/auth/check")
    }

    pub(crate) fn upload_url(&self) -> String {
        self.url("/api/upload")
    }

    /// List endpoint for a kind; `None` for `Unknown`.
    pub(crate) fn list_url(&self, kind: EntityKind) -> Option<String> {
        kind.resource().map(|r| self.url(&format!("/api/{r}")))
    }
}
