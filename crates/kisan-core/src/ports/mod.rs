//! Port definitions
//!
//! Traits the domain depends on whose implementations live in adapter
//! crates.
//!
//! - [`ICredentialStore`] - Persistence of the authenticated session

pub mod credential_store;

pub use credential_store::ICredentialStore;
