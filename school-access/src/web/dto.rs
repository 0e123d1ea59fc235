//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::graph::Edge;
use crate::metrics::{AggregateKpis, Weighting, ZoneKpiRow, ZoneSchoolRow};
use crate::optimizer::{CandidatePlacement, QuickWinConfig};

/// Query parameters for an on-demand quick-win search.
///
/// Unset fields fall back to the server's analysis configuration.
#[derive(Debug, Default, Deserialize)]
pub struct QuickWinQuery {
    /// Stop budget
    pub max_new_stops: Option<usize>,

    /// Primary coverage threshold (minutes)
    pub threshold_min: Option<f64>,

    /// Secondary coverage threshold (minutes)
    pub threshold2_min: Option<f64>,

    /// "uniform" or "students"
    pub weighting: Option<Weighting>,

    /// Place candidates up to this many meters off the nearest stop
    /// instead of at the zone centroid
    pub detour_m: Option<f64>,
}

impl QuickWinQuery {
    /// Overlay the query onto `defaults`.
    pub fn apply(&self, defaults: QuickWinConfig) -> QuickWinConfig {
        let mut search = defaults;
        if let Some(n) = self.max_new_stops {
            search.max_new_stops = n;
        }
        if let Some(t) = self.threshold_min {
            search.threshold_min = t;
        }
        if let Some(t) = self.threshold2_min {
            search.threshold2_min = t;
        }
        if let Some(w) = self.weighting {
            search.weighting = w;
        }
        if let Some(max_offset_m) = self.detour_m {
            search.placement = CandidatePlacement::Detour { max_offset_m };
        }
        search
    }
}

/// Aggregate KPIs with the thresholds they were computed for.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub threshold_min: f64,
    pub threshold2_min: f64,
    pub weighting: Weighting,
    #[serde(flatten)]
    pub kpis: AggregateKpis,
}

/// A stop within walking distance of a zone.
#[derive(Debug, Serialize)]
pub struct ReachableStop {
    pub stop_id: String,
    pub distance_m: f64,
    pub walk_time_min: f64,
}

impl From<&Edge> for ReachableStop {
    fn from(edge: &Edge) -> Self {
        Self {
            stop_id: edge.stop_id.as_str().to_string(),
            distance_m: edge.distance_m,
            walk_time_min: edge.walk_time_min,
        }
    }
}

/// One zone's KPIs and the stops it can walk to, nearest first.
#[derive(Debug, Serialize)]
pub struct ZoneDetailResponse {
    #[serde(flatten)]
    pub kpis: ZoneKpiRow,
    pub stops: Vec<ReachableStop>,
    /// Reach of each school attended from the zone.
    pub schools: Vec<ZoneSchoolRow>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
