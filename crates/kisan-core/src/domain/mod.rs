//! Domain entities and business logic
//!
//! This module contains the core domain types for the portal client:
//! - Newtypes for identifiers and validated values (phone, Aadhaar, acreage)
//! - User profiles, registration input and profile patches
//! - Applications, the review status state machine and admin case files
//! - Subsidy programs and their eligibility limits
//! - Session credentials
//! - Domain-specific error types

pub mod application;
pub mod errors;
pub mod newtypes;
pub mod program;
pub mod session;
pub mod user;

// Re-export commonly used types
pub use application::{
    Application, ApplicationStatus, CaseFile, Crop, CropRecord, Document, DocumentKind,
    NewApplication, Season, StatusChange, Transition,
};
pub use errors::DomainError;
pub use newtypes::*;
pub use program::Program;
pub use session::{Credentials, Session};
pub use user::{ProfileUpdate, RegistrationProfile, Role, User};
