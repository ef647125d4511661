//! Subsidy application domain entities
//!
//! This module defines the application record, the review status state
//! machine, the input for a new submission and the admin case file.
//!
//! ## Status state machine
//!
//! ```text
//! pending ──► under_review ──► approved
//!    │             │  ▲
//!    │             └──┘ (start review again: no-op)
//!    ├────────────────────────► approved
//!    └────────────────────────► rejected ◄── under_review
//! ```
//!
//! `approved` and `rejected` are terminal. Status never moves backward.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    errors::DomainError,
    newtypes::{Acreage, ApplicationId, ProgramId, UserId},
    program::Program,
    user::User,
};

// ============================================================================
// ApplicationStatus
// ============================================================================

/// Review status of a subsidy application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Submitted by the farmer, not yet picked up
    Pending,
    /// An administrator is verifying the case file
    UnderReview,
    /// Subsidy granted (terminal)
    Approved,
    /// Subsidy refused with a stated reason (terminal)
    Rejected,
}

/// Result of checking a status change against the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The status changes to the target
    Apply,
    /// The application is already in the target status; nothing to do
    NoOp,
}

impl ApplicationStatus {
    /// All statuses in forward order
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Pending,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
    ];

    /// Wire name of the status
    pub fn name(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Returns true for `approved` and `rejected`
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Approved | ApplicationStatus::Rejected
        )
    }

    /// Position in the forward ordering; terminal statuses share the last rank
    fn rank(&self) -> u8 {
        match self {
            ApplicationStatus::Pending => 0,
            ApplicationStatus::UnderReview => 1,
            ApplicationStatus::Approved | ApplicationStatus::Rejected => 2,
        }
    }

    /// Checks whether moving to `target` is allowed
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` when leaving a terminal
    /// status, moving backward, or re-entering `pending`.
    pub fn transition(&self, target: ApplicationStatus) -> Result<Transition, DomainError> {
        use ApplicationStatus::*;

        match (self, target) {
            (UnderReview, UnderReview) => Ok(Transition::NoOp),
            (Pending, UnderReview) => Ok(Transition::Apply),
            (Pending | UnderReview, Approved | Rejected) => Ok(Transition::Apply),
            _ => Err(DomainError::InvalidTransition {
                from: self.name().to_string(),
                to: target.name().to_string(),
            }),
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ApplicationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|status| status.name() == normalized)
            .ok_or_else(|| DomainError::UnknownStatus(s.to_string()))
    }
}

// ============================================================================
// StatusChange
// ============================================================================

/// Body of an admin transition request (`{status, remarks?}`)
///
/// Constructed only through the associated functions, so a rejection
/// without remarks cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    status: ApplicationStatus,
    remarks: Option<String>,
}

impl StatusChange {
    /// Move the application into review
    pub fn start_review(note: Option<String>) -> Self {
        Self {
            status: ApplicationStatus::UnderReview,
            remarks: normalize_remarks(note),
        }
    }

    /// Approve the application; blank remarks are dropped
    pub fn approve(remarks: Option<String>) -> Self {
        Self {
            status: ApplicationStatus::Approved,
            remarks: normalize_remarks(remarks),
        }
    }

    /// Reject the application with the reason shown to the farmer
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingRemarks` when the reason is empty or
    /// whitespace only.
    pub fn reject(remarks: impl AsRef<str>) -> Result<Self, DomainError> {
        let reason = remarks.as_ref().trim();
        if reason.is_empty() {
            return Err(DomainError::MissingRemarks);
        }
        Ok(Self {
            status: ApplicationStatus::Rejected,
            remarks: Some(reason.to_string()),
        })
    }

    /// Target status of the change
    pub fn status(&self) -> ApplicationStatus {
        self.status
    }

    /// Remarks sent with the change
    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }
}

fn normalize_remarks(remarks: Option<String>) -> Option<String> {
    remarks
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}

// ============================================================================
// Season and Crop
// ============================================================================

/// Agricultural season an application or program applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    #[default]
    Any,
    Kharif,
    Rabi,
    Zaid,
}

impl Season {
    /// All seasons
    pub const ALL: [Season; 4] = [Season::Any, Season::Kharif, Season::Rabi, Season::Zaid];

    /// Wire name of the season
    pub fn name(&self) -> &'static str {
        match self {
            Season::Any => "Any",
            Season::Kharif => "Kharif",
            Season::Rabi => "Rabi",
            Season::Zaid => "Zaid",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Season {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|season| season.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::UnknownSeason(s.to_string()))
    }
}

/// The fixed set of crops the portal accepts, keyed by server crop id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Crop {
    Rice,
    Wheat,
    Maize,
    Cotton,
    Sugarcane,
    Pulses,
}

impl Crop {
    /// All crops in id order
    pub const ALL: [Crop; 6] = [
        Crop::Rice,
        Crop::Wheat,
        Crop::Maize,
        Crop::Cotton,
        Crop::Sugarcane,
        Crop::Pulses,
    ];

    /// Server-side crop id
    pub fn id(&self) -> u32 {
        match self {
            Crop::Rice => 1,
            Crop::Wheat => 2,
            Crop::Maize => 3,
            Crop::Cotton => 4,
            Crop::Sugarcane => 5,
            Crop::Pulses => 6,
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Crop::Rice => "Rice",
            Crop::Wheat => "Wheat",
            Crop::Maize => "Maize",
            Crop::Cotton => "Cotton",
            Crop::Sugarcane => "Sugarcane",
            Crop::Pulses => "Pulses",
        }
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for Crop {
    type Error = DomainError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|crop| crop.id() == id)
            .ok_or_else(|| DomainError::UnknownCrop(id.to_string()))
    }
}

impl From<Crop> for u32 {
    fn from(crop: Crop) -> Self {
        crop.id()
    }
}

impl FromStr for Crop {
    type Err = DomainError;

    /// Accepts either the crop id (`"2"`) or its name (`"wheat"`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if let Ok(id) = wanted.parse::<u32>() {
            return Crop::try_from(id);
        }
        Self::ALL
            .into_iter()
            .find(|crop| crop.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::UnknownCrop(s.to_string()))
    }
}

// ============================================================================
// Application
// ============================================================================

/// A subsidy application as returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub program_id: ProgramId,
    pub crop_id: u32,
    pub acreage: f64,
    pub season: Season,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

impl Application {
    /// The crop, if the id is one of the known crops
    pub fn crop(&self) -> Option<Crop> {
        Crop::try_from(self.crop_id).ok()
    }

    /// Returns true once the application has been decided
    pub fn is_decided(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Input for a farmer-initiated submission (`POST /applications`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NewApplication {
    pub program_id: ProgramId,
    #[serde(rename = "crop_id")]
    pub crop: Crop,
    pub acreage: Acreage,
    pub season: Season,
}

impl NewApplication {
    /// Builds a submission from typed values
    pub fn new(program_id: ProgramId, crop: Crop, acreage: Acreage, season: Season) -> Self {
        Self {
            program_id,
            crop,
            acreage,
            season,
        }
    }

    /// Builds a submission from raw form values
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown crop id, a non-positive
    /// acreage or an unknown season.
    pub fn from_form(
        program_id: ProgramId,
        crop_id: u32,
        acreage: f64,
        season: &str,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            program_id,
            crop: Crop::try_from(crop_id)?,
            acreage: Acreage::new(acreage)?,
            season: season.parse()?,
        })
    }
}

// ============================================================================
// CaseFile
// ============================================================================

/// Kind of an uploaded supporting document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    IdProof,
    LandDoc,
    Bank,
    #[serde(other)]
    Other,
}

/// A document uploaded for an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub kind: DocumentKind,
    pub file_path: String,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Crop reference as embedded in a case file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRecord {
    pub id: u32,
    pub name: String,
}

/// Everything an administrator needs for manual verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseFile {
    pub application: Application,
    pub user: User,
    pub program: Program,
    pub crop: CropRecord,
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl CaseFile {
    /// Returns true if the applicant's acreage is outside the program limits
    pub fn acreage_out_of_range(&self) -> bool {
        !self.program.admits_land_size(self.application.acreage)
    }
}
