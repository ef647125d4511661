//! Subsidy program catalog

use std::sync::Arc;

use kisan_core::domain::{Acreage, Crop, Program, ProgramId, Season};
use tracing::debug;

use crate::{client::with_query, session::SessionManager, ApiError, ApiResult};

/// Criteria for listing or matching programs
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgramFilter {
    pub crop: Option<Crop>,
    /// `Any` or unset means every season
    pub season: Option<Season>,
    pub land_size: Option<Acreage>,
}

impl ProgramFilter {
    fn season_param(&self) -> Option<String> {
        self.season
            .filter(|s| *s != Season::Any)
            .map(|s| s.name().to_string())
    }

    fn crop_param(&self) -> Option<String> {
        self.crop.map(|c| c.id().to_string())
    }

    /// Returns true if `program` satisfies the land-size criterion
    pub fn admits(&self, program: &Program) -> bool {
        self.land_size
            .map_or(true, |acres| program.admits_land_size(acres.acres()))
    }
}

/// Read-only access to the program catalog
#[derive(Clone)]
pub struct ProgramCatalog {
    session: Arc<SessionManager>,
}

impl ProgramCatalog {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// Lists active programs by crop and season, then by land size
    ///
    /// The server filters crop and season; the land-size limits are
    /// applied locally.
    pub async fn list(&self, filter: &ProgramFilter) -> ApiResult<Vec<Program>> {
        let path = with_query(
            "/programs",
            &[("crop_id", filter.crop_param()), ("season", filter.season_param())],
        );
        let mut programs: Vec<Program> = self.session.get(&path).await?;
        let total = programs.len();
        programs.retain(|p| filter.admits(p));
        debug!(total, kept = programs.len(), "Programs listed");
        Ok(programs)
    }

    /// Fetches one program
    pub async fn get(&self, id: ProgramId) -> ApiResult<Program> {
        self.session
            .get::<Option<Program>>(&format!("/programs/{id}"))
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("program {id}")))
    }

    /// Programs the logged-in farmer is eligible for
    pub async fn match_for_me(&self, filter: &ProgramFilter) -> ApiResult<Vec<Program>> {
        let path = with_query(
            "/programs/match/me",
            &[
                ("crop_id", filter.crop_param()),
                ("land_size", filter.land_size.map(|a| a.acres().to_string())),
                ("season", filter.season_param()),
            ],
        );
        self.session.get(&path).await
    }
}
