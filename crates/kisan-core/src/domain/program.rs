//! Subsidy program catalog entries

use serde::{Deserialize, Serialize};

use super::{application::Season, newtypes::ProgramId};

/// A government subsidy program (read-only on the client)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub authority: String,
    #[serde(default)]
    pub season: Option<Season>,
    #[serde(default)]
    pub min_land_size: Option<f64>,
    #[serde(default)]
    pub max_land_size: Option<f64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Program {
    /// Returns true if `acres` lies within the program's land-size limits
    ///
    /// Missing limits are open-ended.
    pub fn admits_land_size(&self, acres: f64) -> bool {
        let above_min = self.min_land_size.map_or(true, |min| acres >= min);
        let below_max = self.max_land_size.map_or(true, |max| acres <= max);
        above_min && below_max
    }

    /// Returns true if the program runs in `season`
    ///
    /// A program without a season, or with `Any`, runs in every season;
    /// asking for `Any` matches every program.
    pub fn matches_season(&self, season: Season) -> bool {
        match (self.season, season) {
            (None | Some(Season::Any), _) | (_, Season::Any) => true,
            (Some(own), wanted) => own == wanted,
        }
    }

    /// Human-readable land-size range, e.g. `0.5-5 acres`
    pub fn land_range(&self) -> String {
        match (self.min_land_size, self.max_land_size) {
            (Some(min), Some(max)) => format!("{min}-{max} acres"),
            (Some(min), None) => format!("at least {min} acres"),
            (None, Some(max)) => format!("up to {max} acres"),
            (None, None) => "any size".to_string(),
        }
    }
}
