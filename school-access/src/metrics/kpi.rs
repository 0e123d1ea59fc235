//! KPI tables handed to the export layer.

use serde::Serialize;

use crate::domain::{SchoolId, ZoneCode};

/// Per-zone accessibility indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneKpiRow {
    pub zone_code: ZoneCode,
    /// Minutes to the nearest stop; `None` when no stop is within the walk
    /// radius.
    pub nearest_time_min: Option<f64>,
    pub covered_threshold1: bool,
    pub covered_threshold2: bool,
    /// The zone centroid was approximated from a stop.
    pub approximated: bool,
}

/// Population-level coverage summary.
///
/// Percentages are in the 0-100 range. The mean and median walking times are
/// taken over covered zones only: an uncovered zone has no finite nearest
/// time and including it would make both statistics meaningless. The share
/// of such zones is reported separately as `pct_uncovered`.
///
/// If every aggregated zone has zero weight (student weighting with all
/// counts zero) the zones are counted uniformly instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateKpis {
    /// Number of zones aggregated.
    pub zones: usize,
    /// Sum of zone weights (zone count for uniform weighting).
    pub total_weight: f64,
    pub pct_covered_t1: f64,
    pub pct_covered_t2: f64,
    /// Share of zones with no stop within the walk radius.
    pub pct_uncovered: f64,
    pub mean_time_covered: Option<f64>,
    pub median_time_covered: Option<f64>,
}

impl AggregateKpis {
    /// Summary of an empty population.
    pub fn empty() -> Self {
        Self {
            zones: 0,
            total_weight: 0.0,
            pct_covered_t1: 0.0,
            pct_covered_t2: 0.0,
            pct_uncovered: 0.0,
            mean_time_covered: None,
            median_time_covered: None,
        }
    }
}

/// Single-seat reachability of one school from the zones its students live
/// in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolKpiRow {
    pub school_id: SchoolId,
    /// Distinct (zone, school) demand pairs.
    pub zone_pairs: usize,
    /// Pairs with any stop serving the school within the walk radius.
    pub reachable_pairs: usize,
    pub pairs_within_t1: usize,
    pub pairs_within_t2: usize,
    pub pct_within_t1: f64,
    pub pct_within_t2: f64,
}

/// Walking time from one zone to the nearest stop serving one school its
/// students attend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSchoolRow {
    pub zone_code: ZoneCode,
    pub school_id: SchoolId,
    /// `None` when no stop serving the school is within the walk radius.
    pub school_reach_min: Option<f64>,
    pub within_t1: bool,
    pub within_t2: bool,
}

/// Per-zone rollup of its (zone, school) demand pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZonePairKpiRow {
    pub zone_code: ZoneCode,
    /// Distinct schools attended from the zone.
    pub pairs: usize,
    pub reachable_pairs: usize,
    pub pairs_within_t1: usize,
    pub pairs_within_t2: usize,
    pub pct_within_t1: f64,
    pub pct_within_t2: f64,
}
