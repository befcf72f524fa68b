//! Authenticated session.

use serde::{Deserialize, Serialize};

/// The current credential and the identity it belongs to.
///
/// The token is opaque; no shape validation is performed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token attached to every authenticated request.
    pub token: Option<String>,
    /// User name the token was issued for.
    pub identity: Option<String>,
}

impl Session {
    /// Creates an authenticated session.
    pub fn new(token: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            identity: Some(identity.into()),
        }
    }

    /// Returns true iff a token is present.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Returns the token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns the identity, if any.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}
