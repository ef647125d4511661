//! Kisan Core - Domain logic and business rules
//!
//! This crate contains the core of the subsidy portal client:
//! - **Domain entities** - `User`, `Application`, `Program`, `CaseFile`, `Session`
//! - **State machine** - application review status transitions
//! - **Port definitions** - `ICredentialStore` for swappable session persistence
//! - **Configuration** - typed YAML configuration with validation
//!
//! # Architecture
//!
//! The domain module contains pure business rules with no I/O. Ports define
//! trait interfaces that adapter crates implement. The HTTP adapter
//! (`kisan-api`) builds the session manager and the review workflow on top
//! of these types.

pub mod config;
pub mod domain;
pub mod ports;
