//! Greedy quick-win search.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::domain::{Coord, SchoolId, StopId, ZoneCode};
use crate::graph::{AccessGraph, AccessView, GraphError, GraphSnapshot};
use crate::metrics::{AccessMetrics, AggregateKpis, Weighting};

use super::candidates::{Candidate, CandidatePlacement, generate_candidates};

/// Error from the quick-win search.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptimizeError {
    /// The stop budget was zero
    #[error("invalid budget: max_new_stops must be at least 1, got {0}")]
    InvalidBudget(usize),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Parameters of one quick-win search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuickWinConfig {
    /// Coverage threshold the gain is measured against (minutes).
    pub threshold_min: f64,

    /// Looser threshold, reported in the projected KPIs only.
    pub threshold2_min: f64,

    /// Maximum number of stops to propose.
    pub max_new_stops: usize,

    pub weighting: Weighting,

    pub placement: CandidatePlacement,
}

impl QuickWinConfig {
    pub fn new(threshold_min: f64, threshold2_min: f64, max_new_stops: usize) -> Self {
        Self {
            threshold_min,
            threshold2_min,
            max_new_stops,
            ..Self::default()
        }
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_placement(mut self, placement: CandidatePlacement) -> Self {
        self.placement = placement;
        self
    }
}

impl Default for QuickWinConfig {
    fn default() -> Self {
        Self {
            threshold_min: 10.0,
            threshold2_min: 15.0,
            max_new_stops: 10,
            weighting: Weighting::Students,
            placement: CandidatePlacement::Centroid,
        }
    }
}

/// A selected candidate stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickWin {
    /// 1-based selection order.
    pub rank: usize,
    pub candidate_id: StopId,
    #[serde(flatten)]
    pub coord: Coord,
    /// Zone the candidate was generated for.
    pub origin_zone: ZoneCode,
    /// Schools inherited from the nearest existing stop.
    pub schools: Vec<SchoolId>,
    /// Zones first brought within the threshold by this stop, by code.
    pub zones_newly_covered: Vec<ZoneCode>,
    /// Students living in the newly covered zones, where known.
    pub students_served: u64,
    /// Percentage points of coverage added on top of earlier picks.
    pub marginal_gain: f64,
    /// Percentage points added by this and all earlier picks.
    pub cumulative_gain: f64,
}

/// Outcome of a quick-win search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickWinPlan {
    pub baseline: AggregateKpis,
    /// KPIs with every pick inserted.
    pub projected: AggregateKpis,
    pub candidates_considered: usize,
    pub picks: Vec<QuickWin>,
}

/// Gain of one candidate against the current overlay.
#[derive(Debug, Clone)]
struct Scored {
    index: usize,
    gain: f64,
    newly_covered: Vec<usize>,
    students: u64,
}

impl Scored {
    /// Higher gain, then more students served, then earlier candidate.
    ///
    /// `index` is the position among the remaining candidates, which keep
    /// generation order, so the earlier candidate is also the lower id.
    fn rank(&self, other: &Scored) -> Ordering {
        self.gain
            .total_cmp(&other.gain)
            .then(self.students.cmp(&other.students))
            .then(other.index.cmp(&self.index))
    }
}

/// Proposes stop insertions that most improve threshold coverage.
///
/// The search is greedy: each round scores every remaining candidate
/// against the graph with all earlier picks inserted and keeps the best.
/// Rounds stop at the budget or when no candidate adds coverage. The base
/// graph is never modified.
pub struct QuickWinOptimizer<'g> {
    graph: &'g AccessGraph,
    config: QuickWinConfig,
}

impl<'g> QuickWinOptimizer<'g> {
    pub fn new(graph: &'g AccessGraph, config: QuickWinConfig) -> Self {
        Self { graph, config }
    }

    /// Run the search.
    ///
    /// Fails with [`OptimizeError::InvalidBudget`] when `max_new_stops` is
    /// zero, and with [`GraphError::InvalidParameter`] for a negative or
    /// non-finite threshold, a second threshold below the first, or a
    /// negative detour offset. A graph without under-served zones yields an
    /// empty plan.
    pub fn run(&self) -> Result<QuickWinPlan, OptimizeError> {
        let QuickWinConfig {
            threshold_min,
            threshold2_min,
            max_new_stops,
            weighting,
            placement,
        } = self.config;

        if max_new_stops == 0 {
            return Err(OptimizeError::InvalidBudget(max_new_stops));
        }
        if !threshold_min.is_finite() || threshold_min < 0.0 {
            return Err(GraphError::InvalidParameter(format!(
                "threshold must be a non-negative number of minutes, got {threshold_min}"
            ))
            .into());
        }
        if !(threshold2_min.is_finite() && threshold2_min >= threshold_min) {
            return Err(GraphError::InvalidParameter(format!(
                "threshold2_min ({threshold2_min}) must be at least threshold_min ({threshold_min})"
            ))
            .into());
        }
        if let CandidatePlacement::Detour { max_offset_m } = placement {
            if !(max_offset_m.is_finite() && max_offset_m >= 0.0) {
                return Err(GraphError::InvalidParameter(format!(
                    "detour offset must be a non-negative number of meters, got {max_offset_m}"
                ))
                .into());
            }
        }

        let baseline =
            AccessMetrics::new(self.graph).aggregate_all(threshold_min, threshold2_min, weighting);
        let mut remaining = generate_candidates(self.graph, threshold_min, placement)?;
        let candidates_considered = remaining.len();
        debug!(candidates = candidates_considered, "generated quick-win candidates");

        let mut snapshot = self.graph.snapshot();
        let mut current = baseline.clone();
        let mut picks = Vec::new();

        while picks.len() < max_new_stops && !remaining.is_empty() {
            let best = remaining
                .par_iter()
                .enumerate()
                .map(|(index, candidate)| self.score(&snapshot, &current, index, candidate))
                .filter(|scored| scored.gain > 0.0)
                .max_by(|a, b| a.rank(b));

            let Some(best) = best else {
                debug!(round = picks.len() + 1, "no remaining candidate adds coverage");
                break;
            };

            let candidate = remaining.remove(best.index);
            snapshot.insert_stop(candidate.stop.clone());
            current = AccessMetrics::new(&snapshot).aggregate_all(
                threshold_min,
                threshold2_min,
                weighting,
            );

            let zones = self.graph.zones();
            let mut zones_newly_covered: Vec<ZoneCode> = best
                .newly_covered
                .iter()
                .map(|slot| zones[*slot].code.clone())
                .collect();
            zones_newly_covered.sort();

            let pick = QuickWin {
                rank: picks.len() + 1,
                candidate_id: candidate.stop.id.clone(),
                coord: candidate.stop.coord,
                origin_zone: candidate.origin_zone,
                schools: candidate.stop.schools.keys().cloned().collect(),
                zones_newly_covered,
                students_served: best.students,
                marginal_gain: best.gain,
                cumulative_gain: current.pct_covered_t1 - baseline.pct_covered_t1,
            };
            info!(
                rank = pick.rank,
                candidate = %pick.candidate_id,
                zones = pick.zones_newly_covered.len(),
                gain = pick.marginal_gain,
                "selected quick win"
            );
            picks.push(pick);
        }

        Ok(QuickWinPlan {
            baseline,
            projected: current,
            candidates_considered,
            picks,
        })
    }

    /// Score one candidate: insert it into a copy of the overlay and
    /// re-aggregate.
    fn score(
        &self,
        snapshot: &GraphSnapshot<'_>,
        current: &AggregateKpis,
        index: usize,
        candidate: &Candidate,
    ) -> Scored {
        let QuickWinConfig {
            threshold_min,
            threshold2_min,
            weighting,
            ..
        } = self.config;

        let trial = snapshot.with_stop(candidate.stop.clone());
        let before = AccessMetrics::new(snapshot);
        let after = AccessMetrics::new(&trial);
        let projected = after.aggregate_all(threshold_min, threshold2_min, weighting);

        let zones = self.graph.zones();
        let mut newly_covered: Vec<usize> = self
            .graph
            .zones_near(&candidate.stop.coord)
            .into_iter()
            .map(|(slot, _)| slot)
            .filter(|slot| {
                after.covered_at(*slot, threshold_min) && !before.covered_at(*slot, threshold_min)
            })
            .collect();
        newly_covered.sort_unstable();
        let students = newly_covered
            .iter()
            .filter_map(|slot| zones[*slot].student_count)
            .map(u64::from)
            .sum();

        let gain = projected.pct_covered_t1 - current.pct_covered_t1;
        trace!(candidate = %candidate.stop.id, gain, students, "scored candidate");

        Scored {
            index,
            gain,
            newly_covered,
            students,
        }
    }
}
