//! Session store.
//!
//! Owns the bearer token and identity. The session is mirrored into the local
//! store so it survives a reload, and clearing it purges every cached business
//! record so nothing is left behind for the next user of the machine.
//!
//! Every sign-in and sign-out starts a new session epoch. Work captured under
//! an older epoch (a debounced push, an upload in progress) must not reach the
//! server once the epoch has moved on.

use crate::store::{read_lock, write_lock, LocalStore};
use chrono::Utc;
use ipms_types::Session;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Key holding the bearer token.
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// Key holding the signed-in identity.
pub const AUTH_USER_KEY: &str = "auth_user";
/// Host key the host application reads to decide it is signed in.
pub const CURRENT_USER_KEY: &str = "ipms_current_user";
/// Host key holding the host application's user profiles.
pub const USER_PROFILES_KEY: &str = "ipms_user";

/// Holds the current session and keeps the store in step with it.
pub struct SessionStore {
    store: Arc<LocalStore>,
    session: RwLock<Session>,
    epoch: AtomicU64,
}

impl SessionStore {
    /// Creates a signed-out session store over `store`.
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            store,
            session: RwLock::new(Session::default()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Rebuilds the session from keys already present in the store.
    pub fn restore(store: Arc<LocalStore>) -> Self {
        let session = Session {
            token: store.read(AUTH_TOKEN_KEY).filter(|t| !t.is_empty()),
            identity: store.read(AUTH_USER_KEY),
        };
        if session.is_authenticated() {
            debug!("Restored session for {:?}", session.identity);
        }
        Self {
            store,
            session: RwLock::new(session),
            epoch: AtomicU64::new(0),
        }
    }

    /// Stores the session and marks the host application as signed in.
    pub fn set_session(&self, token: &str, identity: &str) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *write_lock(&self.session) = Session::new(token, identity);

        self.store.write_internal(AUTH_TOKEN_KEY, token);
        self.store.write_internal(AUTH_USER_KEY, identity);
        self.store.write_internal(CURRENT_USER_KEY, identity);
        self.merge_user_profile(identity);

        info!("Session established for {}", identity);
    }

    /// Drops the session and purges every locally cached key.
    pub fn clear_session(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *write_lock(&self.session) = Session::default();
        self.store.clear();
        info!("Session cleared, local data purged");
    }

    /// True iff a token is present.
    pub fn is_authenticated(&self) -> bool {
        read_lock(&self.session).is_authenticated()
    }

    /// Current session epoch. Changes on every sign-in and sign-out.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// True if the session is live and still the one started at `epoch`.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.is_authenticated() && self.epoch() == epoch
    }

    /// Current bearer token.
    pub fn token(&self) -> Option<String> {
        read_lock(&self.session).token.clone()
    }

    /// Current identity.
    pub fn identity(&self) -> Option<String> {
        read_lock(&self.session).identity.clone()
    }

    /// Copy of the current session.
    pub fn snapshot(&self) -> Session {
        read_lock(&self.session).clone()
    }

    /// The store the session is mirrored into.
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// Upserts the signed-in user into the host's profile key. The host may
    /// hold either a profile array or a single profile object there.
    fn merge_user_profile(&self, identity: &str) {
        let profile = json!({
            "username": identity,
            "name": identity,
            "role": "admin",
            "lastLogin": Utc::now().to_rfc3339(),
        });

        let existing = self
            .store
            .read(USER_PROFILES_KEY)
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok());

        let merged = match existing {
            Some(Value::Array(mut users)) => {
                let slot = users
                    .iter_mut()
                    .find(|u| u.get("username").and_then(Value::as_str) == Some(identity));
                match slot {
                    Some(user) => *user = profile,
                    None => users.push(profile),
                }
                Value::Array(users)
            }
            Some(_) => profile,
            None => Value::Array(vec![profile]),
        };

        self.store
            .write_internal(USER_PROFILES_KEY, &merged.to_string());
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .field("identity", &self.identity())
            .finish()
    }
}
