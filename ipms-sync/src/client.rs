//! Remote API client.
//!
//! Thin request layer over the IPMS HTTP API. Reads degrade to empty results
//! and writes are fire-and-forget: the engine runs unattended next to a host
//! UI it does not control, so only login and password change report errors.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::session::SessionStore;
use async_trait::async_trait;
use ipms_types::{DataUrl, EntityKind, Record, RecordList};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    /// Opaque bearer token.
    pub token: String,
    /// Identity the token was issued for.
    pub identity: String,
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    token: Option<String>,
    identity: Option<String>,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadBody {
    url: Option<String>,
}

/// Operations the sync engine needs from the server.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Exchanges credentials for a token.
    async fn login(&self, username: &str, password: &str) -> SyncResult<LoginResponse>;

    /// Invalidates the token server-side. Best-effort.
    async fn logout(&self);

    /// Changes the password of the signed-in user.
    async fn change_password(&self, old_password: &str, new_password: &str) -> SyncResult<()>;

    /// Probes token liveness. `Ok(false)` means the token is dead.
    async fn check(&self) -> SyncResult<bool>;

    /// Fetches a kind's list. Never fails; errors yield an empty list.
    async fn fetch_list(&self, kind: EntityKind) -> RecordList;

    /// Replaces a kind's server-side list. Best-effort, not retried.
    async fn push_list(&self, kind: EntityKind, records: &[Record]);

    /// Uploads an inline payload, returning its server URL.
    async fn upload_binary(&self, payload: DataUrl) -> Option<String>;
}

/// `RemoteApi` over HTTP, authenticated from a [`SessionStore`].
pub struct RemoteClient {
    config: SyncConfig,
    client: Client,
    session: Arc<SessionStore>,
}

impl RemoteClient {
    /// Creates a client for the configured server.
    pub fn new(config: SyncConfig, session: Arc<SessionStore>) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            session,
        })
    }

    /// The session the client authenticates with.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    async fn error_message(response: Response) -> Option<String> {
        response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.is_empty())
    }
}

#[async_trait]
impl RemoteApi for RemoteClient {
    async fn login(&self, username: &str, password: &str) -> SyncResult<LoginResponse> {
        debug!("Logging in as {}", username);

        let response = self
            .client
            .post(self.config.login_url())
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("login request failed: {e}")))?;

        if !response.status().is_success() {
            let message = Self::error_message(response)
                .await
                .unwrap_or_else(|| "login failed".to_string());
            return Err(SyncError::Auth(message));
        }

        let body: LoginBody = response
            .json()
            .await
            .map_err(|e| SyncError::Auth(format!("failed to parse login response: {e}")))?;

        let token = body
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SyncError::Auth("login response has no token".to_string()))?;

        Ok(LoginResponse {
            token,
            identity: body
                .identity
                .or(body.username)
                .unwrap_or_else(|| username.to_string()),
        })
    }

    async fn logout(&self) {
        let Some(token) = self.session.token() else {
            return;
        };

        match self
            .client
            .post(self.config.logout_url())
            .bearer_auth(&token)
            .send()
            .await
        {
            Ok(response) => debug!("Logout returned {}", response.status()),
            Err(e) => debug!("Logout request failed, ignoring: {e}"),
        }
    }

    async fn change_password(&self, old_password: &str, new_password: &str) -> SyncResult<()> {
        let token = self.session.token().ok_or(SyncError::AuthRequired)?;

        let response = self
            .client
            .post(self.config.password_url())
            .bearer_auth(&token)
            .json(&serde_json::json!({
                "old_password": old_password,
                "new_password": new_password,
            }))
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("password change failed: {e}")))?;

        if !response.status().is_success() {
            let message = Self::error_message(response)
                .await
                .unwrap_or_else(|| "password change failed".to_string());
            return Err(SyncError::Validation(message));
        }

        info!("Password changed");
        Ok(())
    }

    async fn check(&self) -> SyncResult<bool> {
        let Some(token) = self.session.token() else {
            return Ok(false);
        };

        let response = self
            .client
            .get(self.config.check_url())
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("token check failed: {e}")))?;

        Ok(response.status().is_success())
    }

    async fn fetch_list(&self, kind: EntityKind) -> RecordList {
        let (Some(token), Some(url)) = (self.session.token(), self.config.list_url(kind)) else {
            return Vec::new();
        };

        let response = match self.client.get(&url).bearer_auth(&token).send().await {
            Ok(r) => r,
            Err(e) => {
                error!("[Sync] Network error fetching {}: {}", kind, e);
                return Vec::new();
            }
        };

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("[Auth] 401 fetching {}, dropping session", kind);
            self.session.clear_session();
            return Vec::new();
        }

        if !response.status().is_success() {
            error!("[Sync] Fetch {} failed: {}", kind, response.status());
            return Vec::new();
        }

        match response.json::<RecordList>().await {
            Ok(records) => {
                debug!("[Sync] Fetched {} {}", records.len(), kind);
                records
            }
            Err(e) => {
                error!("[Sync] Unexpected {} payload: {}", kind, e);
                Vec::new()
            }
        }
    }

    async fn push_list(&self, kind: EntityKind, records: &[Record]) {
        let (Some(token), Some(url)) = (self.session.token(), self.config.list_url(kind)) else {
            return;
        };

        match self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(records)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                info!("[Sync] Pushed {} {}", records.len(), kind);
            }
            Ok(response) => {
                error!("[Sync] Push {} rejected: {}", kind, response.status());
            }
            Err(e) => {
                error!("[Sync] Push {} failed: {}", kind, e);
            }
        }
    }

    async fn upload_binary(&self, payload: DataUrl) -> Option<String> {
        let token = self.session.token()?;

        let filename = payload.filename();
        let mime = payload.mime().to_string();
        let size = payload.bytes().len();
        let part = Part::bytes(payload.into_bytes()).file_name(filename.clone());
        let part = match part.mime_str(&mime) {
            Ok(p) => p,
            Err(e) => {
                warn!("[Upload] Unusable MIME type {}: {}", mime, e);
                return None;
            }
        };

        debug!("[Upload] Uploading {} ({} bytes)", filename, size);

        let response = match self
            .client
            .post(self.config.upload_url())
            .bearer_auth(&token)
            .multipart(Form::new().part("file", part))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!("[Upload] Failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            error!("[Upload] Rejected: {}", response.status());
            return None;
        }

        match response.json::<UploadBody>().await {
            Ok(UploadBody { url: Some(url) }) if !url.is_empty() => Some(url),
            Ok(_) => {
                error!("[Upload] Response has no url");
                None
            }
            Err(e) => {
                error!("[Upload] Failed to parse response: {}", e);
                None
            }
        }
    }
}
