//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Integer identifiers assigned by the portal server
// ============================================================================

macro_rules! server_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw server-assigned identifier
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the raw identifier value
            #[must_use]
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim().trim_start_matches('#');
                trimmed
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|e| DomainError::ValidationFailed(format!("Invalid {}: {s} ({e})", $label)))
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

server_id!(
    /// Identifier for portal users (farmers and administrators)
    UserId,
    "user id"
);

server_id!(
    /// Identifier for subsidy applications
    ApplicationId,
    "application id"
);

server_id!(
    /// Identifier for subsidy programs
    ProgramId,
    "program id"
);

// ============================================================================
// Email
// ============================================================================

/// A syntactically valid email address
///
/// The address is stored as entered (trimmed); the server compares emails
/// verbatim so no case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Create a new validated Email
    ///
    /// # Errors
    /// Returns error if the email format is invalid
    pub fn new(email: impl Into<String>) -> Result<Self, DomainError> {
        let email = email.into().trim().to_string();
        Self::validate(&email)?;
        Ok(Self(email))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(email: &str) -> Result<(), DomainError> {
        if email.is_empty() {
            return Err(DomainError::InvalidEmail(
                "Email cannot be empty".to_string(),
            ));
        }

        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() != 2 {
            return Err(DomainError::InvalidEmail(format!(
                "Email must contain exactly one '@': {email}"
            )));
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() {
            return Err(DomainError::InvalidEmail(format!(
                "Email local part cannot be empty: {email}"
            )));
        }

        if !local
            .chars()
            .all(|c| c.is_alphanumeric() || ".+-_".contains(c))
        {
            return Err(DomainError::InvalidEmail(format!(
                "Email local part contains invalid characters: {email}"
            )));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(DomainError::InvalidEmail(format!(
                "Email domain must contain at least one dot: {email}"
            )));
        }

        for label in domain.split('.') {
            if label.is_empty() {
                return Err(DomainError::InvalidEmail(format!(
                    "Email domain contains empty label: {email}"
                )));
            }
            if !label.chars().all(|c| c.is_alphanumeric() || c == '-')
                || label.starts_with('-')
                || label.ends_with('-')
            {
                return Err(DomainError::InvalidEmail(format!(
                    "Email domain label is malformed: {email}"
                )));
            }
        }

        Ok(())
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Email {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

// ============================================================================
// PhoneNumber
// ============================================================================

/// An Indian mobile number: exactly 10 digits, the first one 6-9
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Create a new validated PhoneNumber
    ///
    /// # Errors
    /// Returns error unless the input is 10 digits starting with 6, 7, 8 or 9
    pub fn new(phone: impl Into<String>) -> Result<Self, DomainError> {
        let phone = phone.into().trim().to_string();
        let valid = phone.len() == 10
            && phone.chars().all(|c| c.is_ascii_digit())
            && matches!(phone.chars().next(), Some('6'..='9'));

        if valid {
            Ok(Self(phone))
        } else {
            Err(DomainError::InvalidPhone(format!(
                "must be 10 digits starting with 6-9, got '{phone}'"
            )))
        }
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PhoneNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}

// ============================================================================
// Aadhaar
// ============================================================================

/// A 12-digit Aadhaar identity number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Aadhaar(String);

impl Aadhaar {
    /// Create a new validated Aadhaar number
    ///
    /// # Errors
    /// Returns error unless the input is exactly 12 ASCII digits
    pub fn new(number: impl Into<String>) -> Result<Self, DomainError> {
        let number = number.into().trim().to_string();
        if number.len() == 12 && number.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(number))
        } else {
            Err(DomainError::InvalidAadhaar(format!(
                "must be exactly 12 digits, got '{number}'"
            )))
        }
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Aadhaar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Aadhaar {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Aadhaar> for String {
    fn from(number: Aadhaar) -> Self {
        number.0
    }
}

// ============================================================================
// Acreage
// ============================================================================

/// Land size in acres; always finite and strictly positive
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Acreage(f64);

impl Acreage {
    /// Create a new validated Acreage
    ///
    /// # Errors
    /// Returns error if the value is not a finite number greater than zero
    pub fn new(acres: f64) -> Result<Self, DomainError> {
        if acres.is_finite() && acres > 0.0 {
            Ok(Self(acres))
        } else {
            Err(DomainError::InvalidAcreage(format!(
                "must be greater than 0, got {acres}"
            )))
        }
    }

    /// Get the value in acres
    #[must_use]
    pub const fn acres(&self) -> f64 {
        self.0
    }
}

impl Display for Acreage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Acreage {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let acres = s
            .trim()
            .parse::<f64>()
            .map_err(|e| DomainError::InvalidAcreage(format!("{s}: {e}")))?;
        Self::new(acres)
    }
}

impl TryFrom<f64> for Acreage {
    type Error = DomainError;

    fn try_from(acres: f64) -> Result<Self, Self::Error> {
        Self::new(acres)
    }
}

impl From<Acreage> for f64 {
    fn from(acreage: Acreage) -> Self {
        acreage.0
    }
}

// ============================================================================
// Tests
// ============================================================================
