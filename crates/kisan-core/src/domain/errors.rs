//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including input validation failures and invalid status transitions.
//! Every variant is raised before any network call is made.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid email address format
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    /// Invalid mobile number (10 digits starting with 6-9)
    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    /// Invalid Aadhaar number (12 digits)
    #[error("Invalid Aadhaar number: {0}")]
    InvalidAadhaar(String),

    /// Acreage is zero, negative or not a finite number
    #[error("Invalid acreage: {0}")]
    InvalidAcreage(String),

    /// Crop id is not one of the supported crops
    #[error("Unknown crop: {0}")]
    UnknownCrop(String),

    /// Season is not one of Any, Kharif, Rabi, Zaid
    #[error("Unknown season: {0}")]
    UnknownSeason(String),

    /// Application status name is not recognised
    #[error("Unknown application status: {0}")]
    UnknownStatus(String),

    /// The referenced program does not exist
    #[error("Unknown program: {0}")]
    UnknownProgram(String),

    /// A rejection was requested without a reason for the farmer
    #[error("Rejection requires remarks explaining the reason")]
    MissingRemarks,

    /// A required field was left blank
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Invalid state transition attempt
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status
        from: String,
        /// The attempted target status
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
