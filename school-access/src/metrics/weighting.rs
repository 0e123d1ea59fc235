//! Zone weighting for aggregate indicators.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::Zone;

/// How much each zone counts in aggregate KPIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Every zone counts once.
    Uniform,
    /// Zones count by resident students; zones without a count weigh 1.
    Students,
}

impl Weighting {
    /// Weight of a zone.
    pub fn weight(&self, zone: &Zone) -> f64 {
        match self {
            Weighting::Uniform => 1.0,
            Weighting::Students => zone.student_count.map_or(1.0, f64::from),
        }
    }
}

/// Error returned when parsing an unknown weighting name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown weighting {0:?}: expected \"uniform\" or \"students\"")]
pub struct InvalidWeighting(String);

impl FromStr for Weighting {
    type Err = InvalidWeighting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(Weighting::Uniform),
            "students" => Ok(Weighting::Students),
            _ => Err(InvalidWeighting(s.to_string())),
        }
    }
}
