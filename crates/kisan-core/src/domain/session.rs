//! Authenticated session state
//!
//! A [`Session`] pairs the opaque token pair issued by the portal with the
//! cached profile of the logged-in user. Tokens are never inspected on the
//! client.

use serde::{Deserialize, Serialize};

use super::user::User;

/// Access and refresh tokens issued by the portal
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl Credentials {
    /// Creates a token pair
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
        }
    }

    /// Returns true if a renewal can be attempted
    pub fn can_renew(&self) -> bool {
        self.refresh_token.is_some()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// The persisted client session
///
/// Serialized flat as `{access_token, refresh_token, user}` so the whole
/// session is stored as a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default)]
    pub user: Option<User>,
}

impl Session {
    /// Creates a session for a freshly logged-in user
    pub fn new(credentials: Credentials, user: Option<User>) -> Self {
        Self { credentials, user }
    }

    /// Returns a copy with the token pair replaced and the profile kept
    #[must_use]
    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        Self {
            credentials,
            user: self.user.clone(),
        }
    }

    /// Access token to attach as bearer credential
    pub fn access_token(&self) -> &str {
        &self.credentials.access_token
    }
}
