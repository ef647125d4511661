//! Credential store port (driven/secondary port)
//!
//! Persists the client [`Session`] between runs. The store never talks to
//! the network and treats tokens as opaque strings.
//!
//! ## Design Notes
//!
//! - The trait is synchronous: every backend (memory, file, OS keyring)
//!   completes in bounded local time.
//! - Uses `anyhow::Result` for writes because persistence errors are
//!   adapter-specific.
//! - A session is saved as one unit, so a reader never observes new tokens
//!   next to a stale profile or the reverse.

use crate::domain::Session;

/// Persistent storage for the authenticated session
pub trait ICredentialStore: Send + Sync {
    /// Reads the stored session
    ///
    /// Never fails: missing or unreadable data is reported as `None`.
    fn load(&self) -> Option<Session>;

    /// Replaces the stored session with `session`
    fn save(&self, session: &Session) -> anyhow::Result<()>;

    /// Removes all stored session data
    fn clear(&self) -> anyhow::Result<()>;
}
