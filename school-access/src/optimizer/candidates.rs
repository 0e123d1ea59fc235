//! Candidate stop generation.

use serde::{Deserialize, Serialize};

use crate::domain::{Coord, DomainError, Stop, StopId, ZoneCode};
use crate::graph::{AccessGraph, AccessView, GraphError};
use crate::metrics::AccessMetrics;

/// Where a candidate stop for an under-served zone is placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidatePlacement {
    /// At the zone centroid.
    Centroid,
    /// A minor detour of an existing route: from the nearest existing stop,
    /// moved toward the zone centroid by at most `max_offset_m`.
    Detour { max_offset_m: f64 },
}

impl CandidatePlacement {
    fn place(&self, graph: &AccessGraph, centroid: &Coord) -> Coord {
        match self {
            CandidatePlacement::Centroid => *centroid,
            CandidatePlacement::Detour { max_offset_m } => graph
                .nearest_stop(centroid)
                .map_or(*centroid, |stop| stop.coord.toward(centroid, *max_offset_m)),
        }
    }
}

/// A hypothetical stop proposed for one under-served zone.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub stop: Stop,
    /// The zone the candidate was generated for.
    pub origin_zone: ZoneCode,
}

/// One candidate per zone whose nearest stop is further than
/// `threshold_min` minutes away, or which has no stop at all.
///
/// Candidates are numbered `QW-0001`, `QW-0002`, ... in zone code order and
/// inherit the school associations of the existing stop nearest to them.
pub fn generate_candidates(
    graph: &AccessGraph,
    threshold_min: f64,
    placement: CandidatePlacement,
) -> Result<Vec<Candidate>, GraphError> {
    let metrics = AccessMetrics::new(graph);

    let mut underserved: Vec<_> = graph
        .zones()
        .iter()
        .enumerate()
        .filter(|(slot, _)| {
            metrics
                .nearest_time_at(*slot)
                .is_none_or(|t| t > threshold_min)
        })
        .map(|(_, zone)| zone)
        .collect();
    underserved.sort_by(|a, b| a.code.cmp(&b.code));

    underserved
        .into_iter()
        .enumerate()
        .map(|(i, zone)| {
            let id = StopId::new(format!("QW-{:04}", i + 1)).map_err(DomainError::from)?;
            let coord = placement.place(graph, &zone.coord);
            let schools = graph
                .nearest_stop(&coord)
                .map(|s| s.schools.clone())
                .unwrap_or_default();
            Ok::<_, GraphError>(Candidate {
                stop: Stop::candidate(id, coord, schools),
                origin_zone: zone.code.clone(),
            })
        })
        .collect()
}
