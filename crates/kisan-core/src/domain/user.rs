//! User domain types
//!
//! This module defines the authenticated user's profile as returned by the
//! portal, the registration input for new farmers, and partial profile
//! updates.

use serde::{Deserialize, Serialize};

use super::{
    errors::DomainError,
    newtypes::{Aadhaar, Email, PhoneNumber, UserId},
};

/// Portal role of a user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Submits applications for their own land
    #[default]
    Farmer,
    /// Reviews and decides applications
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Farmer => write!(f, "farmer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Profile of a portal user as returned by the server
///
/// Optional profile fields default to `None` because administrator
/// accounts are seeded without them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub aadhar: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl User {
    /// Returns true if this user may review applications
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Input for registering a new farmer account
#[derive(Clone, Serialize, Deserialize)]
pub struct RegistrationProfile {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    pub state: String,
    pub district: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aadhar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_path: Option<String>,
}

impl std::fmt::Debug for RegistrationProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationProfile")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("phone", &self.phone)
            .field("state", &self.state)
            .field("district", &self.district)
            .finish_non_exhaustive()
    }
}

impl RegistrationProfile {
    /// Checks the profile before it is sent to the server
    ///
    /// # Errors
    ///
    /// Returns the first problem found: a blank required field, a malformed
    /// email, a phone number that is not 10 digits starting with 6-9, or an
    /// Aadhaar number that is not 12 digits.
    pub fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("name", &self.name),
            ("password", &self.password),
            ("state", &self.state),
            ("district", &self.district),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::MissingField(field.to_string()));
            }
        }

        Email::new(self.email.as_str())?;
        PhoneNumber::new(self.phone.as_str())?;

        if let Some(aadhar) = self.aadhar.as_deref().filter(|a| !a.trim().is_empty()) {
            Aadhaar::new(aadhar)?;
        }

        Ok(())
    }
}

/// Partial update of a user's profile (`PUT /users/{id}`)
///
/// Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aadhar: Option<String>,
}

impl ProfileUpdate {
    /// Returns true if no field is set
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.gender.is_none()
            && self.dob.is_none()
            && self.state.is_none()
            && self.district.is_none()
            && self.aadhar.is_none()
    }

    /// Checks the patch before it is sent to the server
    ///
    /// # Errors
    ///
    /// Returns an error for an empty patch or for malformed email, phone or
    /// Aadhaar values.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.is_empty() {
            return Err(DomainError::ValidationFailed(
                "no profile fields to update".to_string(),
            ));
        }
        if let Some(email) = &self.email {
            Email::new(email.as_str())?;
        }
        if let Some(phone) = &self.phone {
            PhoneNumber::new(phone.as_str())?;
        }
        if let Some(aadhar) = &self.aadhar {
            Aadhaar::new(aadhar.as_str())?;
        }
        Ok(())
    }
}
