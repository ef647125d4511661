//! Session manager
//!
//! [`SessionManager`] is the single entry point for portal API calls. It
//! attaches the stored access token to every request and, when a request
//! fails with HTTP 401, renews the token pair once and replays the request.
//!
//! ## Renewal protocol
//!
//! 1. No refresh token stored: the original 401 is returned.
//! 2. Otherwise `POST /auth/refresh` is issued directly on the
//!    [`ApiClient`], never through [`SessionManager::request`].
//! 3. On success the stored session is replaced as a whole and the original
//!    request is replayed once with the new access token.
//! 4. On failure the original 401 is returned. The session is left in
//!    place; [`ApiError::requires_login`] tells the caller to clear it.
//! 5. A 401 on the replay is returned as is; there is no second renewal.
//!
//! Renewal is single-flight: requests that fail while a renewal is running
//! wait for it and reuse its outcome instead of renewing again. The server
//! rotates refresh tokens, so a duplicate renewal would be refused. A request
//! sent after a failed renewal finished gets its own attempt.
//!
//! Renewed tokens are only applied if the session they were issued for is
//! still current. A login or logout that lands while the refresh call is in
//! flight wins and the renewed tokens are dropped.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use kisan_core::{
    domain::{
        Credentials, DomainError, Email, ProfileUpdate, RegistrationProfile, Session, User, UserId,
    },
    ports::ICredentialStore,
};
use reqwest::Method;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{
    client::{decode, ApiClient, TokenResponse},
    ApiError, ApiResult,
};

/// Outcome of `POST /auth/forgot-password`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetTicket {
    /// Message to show the user
    #[serde(default)]
    pub msg: String,
    /// Reset token, when the server hands it out directly
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    msg: Option<String>,
}

/// Cached copy of the stored session
#[derive(Debug, Default)]
struct SessionSlot {
    current: Option<Session>,
    /// Bumped on every login and logout
    epoch: u64,
}

/// State a request was sent with, captured before sending
#[derive(Debug)]
struct SentWith {
    token: Option<String>,
    epoch: u64,
    renewals: u64,
}

/// Access token to replay with after a renewal
struct Renewal {
    access_token: String,
    /// Set when the renewed session could not be written to the store
    persist_error: Option<anyhow::Error>,
}

impl Renewal {
    fn reused(access_token: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
            persist_error: None,
        }
    }
}

/// Owns the authenticated session and performs all API requests
pub struct SessionManager {
    client: ApiClient,
    store: Arc<dyn ICredentialStore>,
    /// Writers also update the store while holding the write lock
    slot: RwLock<SessionSlot>,
    /// Serializes refresh calls
    renewal: Mutex<()>,
    /// Finished refresh calls, successful or not
    renewals: AtomicU64,
}

impl SessionManager {
    /// Creates a manager and loads any persisted session from `store`
    pub fn new(client: ApiClient, store: Arc<dyn ICredentialStore>) -> Self {
        let session = store.load();
        if let Some(user) = session.as_ref().and_then(|s| s.user.as_ref()) {
            debug!(user_id = %user.id, "Restored stored session");
        }
        Self {
            client,
            store,
            slot: RwLock::new(SessionSlot {
                current: session,
                epoch: 0,
            }),
            renewal: Mutex::new(()),
            renewals: AtomicU64::new(0),
        }
    }

    /// The underlying HTTP client
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Snapshot of the current session
    pub async fn current_session(&self) -> Option<Session> {
        self.slot.read().await.current.clone()
    }

    /// Profile of the logged-in user, if known
    pub async fn current_user(&self) -> Option<User> {
        self.slot
            .read()
            .await
            .current
            .as_ref()
            .and_then(|s| s.user.clone())
    }

    /// Returns true if credentials are stored
    pub async fn is_authenticated(&self) -> bool {
        self.slot.read().await.current.is_some()
    }

    async fn sent_with(&self) -> SentWith {
        let slot = self.slot.read().await;
        SentWith {
            token: slot.current.as_ref().map(|s| s.access_token().to_string()),
            epoch: slot.epoch,
            renewals: self.renewals.load(Ordering::SeqCst),
        }
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Sends an authenticated request, renewing the token once on 401
    ///
    /// # Errors
    ///
    /// [`ApiError::Storage`] if the request succeeded after a renewal but
    /// the renewed session could not be persisted.
    pub async fn request<B>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<Value>
    where
        B: Serialize + ?Sized,
    {
        let sent = self.sent_with().await;

        match self
            .client
            .send(method.clone(), path, sent.token.as_deref(), body)
            .await
        {
            Err(ApiError::Unauthorized(message)) => {
                let Some(renewal) = self.renew(&sent).await else {
                    return Err(ApiError::Unauthorized(message));
                };
                debug!(%method, path, "Replaying request with renewed access token");
                let value = self
                    .client
                    .send(method, path, Some(&renewal.access_token), body)
                    .await?;
                match renewal.persist_error {
                    Some(e) => Err(ApiError::Storage(e)),
                    None => Ok(value),
                }
            }
            outcome => outcome,
        }
    }

    /// `GET path`, decoded as `T`
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let value = self.request::<()>(Method::GET, path, None).await?;
        decode(value, path)
    }

    /// `POST path` with a JSON body, decoded as `T`
    pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.request(Method::POST, path, Some(body)).await?;
        decode(value, path)
    }

    /// `PUT path` with a JSON body, decoded as `T`
    pub async fn put<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.request(Method::PUT, path, Some(body)).await?;
        decode(value, path)
    }

    /// Renews the token pair after the token in `sent` was refused
    ///
    /// Returns the access token to replay with, or `None` when the original
    /// failure should be returned.
    async fn renew(&self, sent: &SentWith) -> Option<Renewal> {
        let _guard = self.renewal.lock().await;

        let current = {
            let slot = self.slot.read().await;
            if slot.epoch != sent.epoch {
                debug!("Session replaced while the request was in flight");
                return None;
            }
            slot.current.clone()?
        };
        if Some(current.access_token()) != sent.token.as_deref() {
            debug!("Access token already renewed by a concurrent request");
            return Some(Renewal::reused(current.access_token()));
        }
        if self.renewals.load(Ordering::SeqCst) != sent.renewals {
            debug!("Concurrent renewal for this access token was refused");
            return None;
        }
        if !current.credentials.can_renew() {
            debug!("No refresh token stored, cannot renew");
            return None;
        }
        let refresh_token = current.credentials.refresh_token.clone()?;

        let outcome = self.client.refresh(&refresh_token).await;
        self.renewals.fetch_add(1, Ordering::SeqCst);
        let tokens = match outcome {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Token renewal failed");
                return None;
            }
        };

        let mut slot = self.slot.write().await;
        let unchanged = slot.epoch == sent.epoch
            && slot.current.as_ref().map(Session::access_token) == Some(current.access_token());
        let session = match slot.current.as_mut() {
            Some(session) if unchanged => session,
            _ => {
                info!("Session replaced during renewal, discarding renewed tokens");
                return None;
            }
        };

        // Keep the cached profile, it may be newer than `current`
        let credentials = Credentials::new(
            tokens.access_token,
            tokens.refresh_token.or(Some(refresh_token)),
        );
        let mut renewed = session.with_credentials(credentials);
        if tokens.user.is_some() {
            renewed.user = tokens.user;
        }
        let persist_error = match self.store.save(&renewed) {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    error = %format!("{e:#}"),
                    "Failed to persist renewed session; the stored refresh token is revoked and the next start will require login"
                );
                Some(e)
            }
        };
        let access_token = renewed.access_token().to_string();
        *session = renewed;

        info!("Access token renewed");
        Some(Renewal {
            access_token,
            persist_error,
        })
    }

    /// Replaces the stored and cached session together
    async fn replace_session(&self, session: Option<Session>) -> ApiResult<()> {
        let mut slot = self.slot.write().await;
        let stored = match &session {
            Some(s) => self.store.save(s),
            None => self.store.clear(),
        };
        match stored {
            Ok(()) => {
                slot.current = session;
                slot.epoch += 1;
                Ok(())
            }
            Err(e) if session.is_none() => {
                slot.current = None;
                slot.epoch += 1;
                Err(ApiError::Storage(e))
            }
            Err(e) => Err(ApiError::Storage(e)),
        }
    }

    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------

    /// Logs in and stores the returned tokens and profile
    ///
    /// # Errors
    ///
    /// Invalid credentials are reported as [`ApiError::Authentication`].
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let body = serde_json::json!({ "email": email.trim(), "password": password });

        let value = self
            .client
            .send(Method::POST, "/auth/login", None, Some(&body))
            .await
            .map_err(into_authentication_error)?;
        let tokens: TokenResponse = decode(value, "login response")?;
        let user = tokens
            .user
            .ok_or_else(|| ApiError::InvalidResponse("login response has no user".into()))?;

        let session = Session::new(
            Credentials::new(tokens.access_token, tokens.refresh_token),
            Some(user.clone()),
        );
        self.replace_session(Some(session)).await?;

        info!(user_id = %user.id, role = %user.role, "Logged in");
        Ok(user)
    }

    /// Creates a farmer account, then logs in with the same credentials
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] for malformed input; nothing is sent.
    /// - The server's error if the account could not be created.
    /// - [`ApiError::Registration`] if the account was created but the
    ///   login failed; no session is stored in that case.
    pub async fn register(&self, profile: &RegistrationProfile) -> ApiResult<User> {
        profile.validate()?;

        let value = self
            .client
            .send(Method::POST, "/auth/register", None, Some(profile))
            .await?;
        let created: User = decode(value, "registration response")?;
        info!(user_id = %created.id, "Account registered");

        match self.login(&profile.email, &profile.password).await {
            Ok(user) => Ok(user),
            Err(e) => {
                warn!(user_id = %created.id, error = %e, "Login after registration failed");
                Err(ApiError::Registration {
                    user: Box::new(created),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Forgets the stored session; no server call is made
    pub async fn logout(&self) -> ApiResult<()> {
        self.replace_session(None).await?;
        info!("Logged out");
        Ok(())
    }

    /// Asks the server to start a password reset for `email`
    pub async fn forgot_password(&self, email: &str) -> ApiResult<PasswordResetTicket> {
        let email = Email::new(email)?;
        let body = serde_json::json!({ "email": email.as_str() });
        let value = self
            .client
            .send(Method::POST, "/auth/forgot-password", None, Some(&body))
            .await?;
        decode(value, "forgot-password response")
    }

    /// Sets a new password using a reset token
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ApiResult<String> {
        if token.trim().is_empty() {
            return Err(DomainError::MissingField("token".into()).into());
        }
        if new_password.is_empty() {
            return Err(DomainError::MissingField("new_password".into()).into());
        }

        let body = serde_json::json!({ "token": token.trim(), "new_password": new_password });
        let value = self
            .client
            .send(Method::POST, "/auth/reset-password", None, Some(&body))
            .await?;
        let response: MessageResponse = decode(value, "reset-password response")?;
        Ok(response
            .msg
            .unwrap_or_else(|| "Password reset successful".to_string()))
    }

    // ------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------

    /// Updates a user's profile
    ///
    /// When the updated user is the logged-in user, the cached and stored
    /// profile is replaced with the server's copy.
    pub async fn update_profile(&self, user_id: UserId, patch: &ProfileUpdate) -> ApiResult<User> {
        patch.validate()?;

        let updated: User = self.put(&format!("/users/{user_id}"), patch).await?;

        let mut slot = self.slot.write().await;
        if let Some(session) = slot.current.as_mut() {
            if session.user.as_ref().map(|u| u.id) == Some(updated.id) {
                session.user = Some(updated.clone());
                if let Err(e) = self.store.save(session) {
                    warn!(error = %format!("{e:#}"), "Failed to persist updated profile");
                }
                debug!(user_id = %updated.id, "Refreshed cached profile");
            }
        }

        info!(user_id = %updated.id, "Profile updated");
        Ok(updated)
    }
}

fn into_authentication_error(err: ApiError) -> ApiError {
    match err {
        ApiError::Unauthorized(message) | ApiError::Forbidden(message) => {
            ApiError::Authentication(message)
        }
        ApiError::Rejected {
            status: 400,
            message,
        } => ApiError::Authentication(message),
        other => other,
    }
}
