//! Kisan API - subsidy portal REST client
//!
//! Provides the async client side of the portal:
//! - Bearer-authenticated requests with transparent token renewal
//! - Login, registration, password recovery and profile updates
//! - The application status workflow for farmers and administrators
//! - The admin review flow (open case, decide, refresh the queue)
//! - Session persistence backends (memory, file, OS keyring)
//!
//! ## Modules
//!
//! - [`client`] - Low-level HTTP client and status mapping
//! - [`credentials`] - [`ICredentialStore`](kisan_core::ports::ICredentialStore) backends
//! - [`session`] - [`SessionManager`](session::SessionManager), the single entry point for API calls
//! - [`workflow`] - Application submission and status transitions
//! - [`review`] - Admin review coordinator
//! - [`programs`] - Subsidy program catalog

pub mod client;
pub mod credentials;
pub mod programs;
pub mod review;
pub mod session;
pub mod workflow;

use kisan_core::domain::{DomainError, User};
use thiserror::Error;

/// Result alias for portal API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur when talking to the portal
#[derive(Debug, Error)]
pub enum ApiError {
    /// Input was rejected locally; no request was sent
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// Login or token renewal was refused by the server
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// An authenticated request was refused and could not be renewed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The account was created but the follow-up login failed
    #[error("Account {} was created but login failed: {message}", .user.email)]
    Registration {
        /// The newly created account
        user: Box<User>,
        /// Why the login failed
        message: String,
    },

    /// The transition is not allowed from the application's current status
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The user's role does not allow the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other client error reported by the server
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Server-provided explanation
        message: String,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    Server(String),

    /// A network-level error occurred (connection, timeout)
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The session could not be persisted or removed
    #[error("Session storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl ApiError {
    /// Returns true if the stored session is no longer usable and the user
    /// has to log in again
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Returns true if the caller's view of the resource is stale and must
    /// be re-fetched before deciding what to do next
    pub fn should_resync(&self) -> bool {
        matches!(self, ApiError::Conflict(_))
    }

    /// Returns true if the error was raised locally before any request
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Validation(_))
    }
}
