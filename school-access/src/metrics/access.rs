//! Per-zone and aggregate accessibility metrics.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::domain::{SchoolId, ZoneCode, ZoneDemand};
use crate::graph::{AccessView, GraphError};

use super::kpi::{AggregateKpis, SchoolKpiRow, ZoneKpiRow, ZonePairKpiRow, ZoneSchoolRow};
use super::weighting::Weighting;

/// Metric queries over an access graph or one of its snapshots.
///
/// A zone with no edges is *uncovered*: its nearest time is `None`, never
/// zero and never an error. Only zone codes that were not loaded fail.
#[derive(Debug, Clone, Copy)]
pub struct AccessMetrics<'v, V: AccessView> {
    view: &'v V,
}

impl<'v, V: AccessView> AccessMetrics<'v, V> {
    pub fn new(view: &'v V) -> Self {
        Self { view }
    }

    /// True if the zone has a stop within `threshold_min` minutes' walk.
    pub fn coverage(&self, zone: &ZoneCode, threshold_min: f64) -> Result<bool, GraphError> {
        let slot = self.view.zone_slot(zone)?;
        Ok(self.covered_at(slot, threshold_min))
    }

    /// Minutes to the nearest stop, or `None` if the zone is uncovered.
    pub fn nearest_time(&self, zone: &ZoneCode) -> Result<Option<f64>, GraphError> {
        let slot = self.view.zone_slot(zone)?;
        Ok(self.nearest_time_at(slot))
    }

    /// Minutes to the nearest stop serving `school`, or `None`.
    pub fn school_reach(
        &self,
        zone: &ZoneCode,
        school: &SchoolId,
    ) -> Result<Option<f64>, GraphError> {
        let slot = self.view.zone_slot(zone)?;
        Ok(self
            .view
            .edges_at(slot)
            .filter(|e| self.view.stop_at(e.stop_slot).serves(school))
            .map(|e| e.walk_time_min)
            .min_by(f64::total_cmp))
    }

    /// Aggregate indicators over the given zones.
    ///
    /// See [`AggregateKpis`] for why uncovered zones are left out of the
    /// mean and median.
    pub fn aggregate(
        &self,
        zones: &[ZoneCode],
        threshold_min: f64,
        threshold2_min: f64,
        weighting: Weighting,
    ) -> Result<AggregateKpis, GraphError> {
        let slots = zones
            .iter()
            .map(|code| self.view.zone_slot(code))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.aggregate_slots(slots, threshold_min, threshold2_min, weighting))
    }

    /// Aggregate indicators over every zone in the graph.
    pub fn aggregate_all(
        &self,
        threshold_min: f64,
        threshold2_min: f64,
        weighting: Weighting,
    ) -> AggregateKpis {
        self.aggregate_slots(
            0..self.view.zones().len(),
            threshold_min,
            threshold2_min,
            weighting,
        )
    }

    /// One KPI row per zone, in graph order.
    pub fn zone_rows(&self, threshold_min: f64, threshold2_min: f64) -> Vec<ZoneKpiRow> {
        self.view
            .zones()
            .iter()
            .enumerate()
            .map(|(slot, zone)| {
                let nearest = self.nearest_time_at(slot);
                ZoneKpiRow {
                    zone_code: zone.code.clone(),
                    nearest_time_min: nearest,
                    covered_threshold1: nearest.is_some_and(|t| t <= threshold_min),
                    covered_threshold2: nearest.is_some_and(|t| t <= threshold2_min),
                    approximated: zone.is_approximated(),
                }
            })
            .collect()
    }

    /// School walking time for every distinct (zone, school) demand pair.
    ///
    /// Rows are ordered by zone code, then school id.
    pub fn zone_school_rows(
        &self,
        demand: &[ZoneDemand],
        threshold_min: f64,
        threshold2_min: f64,
    ) -> Result<Vec<ZoneSchoolRow>, GraphError> {
        let pairs: BTreeSet<(&ZoneCode, &SchoolId)> =
            demand.iter().map(|d| (&d.zone, &d.school)).collect();

        pairs
            .into_iter()
            .map(|(zone, school)| {
                let reach = self.school_reach(zone, school)?;
                Ok(ZoneSchoolRow {
                    zone_code: zone.clone(),
                    school_id: school.clone(),
                    school_reach_min: reach,
                    within_t1: reach.is_some_and(|t| t <= threshold_min),
                    within_t2: reach.is_some_and(|t| t <= threshold2_min),
                })
            })
            .collect()
    }

    /// Per-zone share of demand pairs whose school stop is within reach.
    ///
    /// Only zones that appear in `demand` get a row; rows are ordered by
    /// zone code.
    pub fn zone_pair_rows(
        &self,
        demand: &[ZoneDemand],
        threshold_min: f64,
        threshold2_min: f64,
    ) -> Result<Vec<ZonePairKpiRow>, GraphError> {
        let rows = self.zone_school_rows(demand, threshold_min, threshold2_min)?;

        let mut per_zone: BTreeMap<&ZoneCode, PairTally> = BTreeMap::new();
        for row in &rows {
            per_zone.entry(&row.zone_code).or_default().add(row);
        }

        Ok(per_zone
            .into_iter()
            .map(|(zone, tally)| ZonePairKpiRow {
                zone_code: zone.clone(),
                pairs: tally.pairs,
                reachable_pairs: tally.reachable,
                pairs_within_t1: tally.within_t1,
                pairs_within_t2: tally.within_t2,
                pct_within_t1: tally.pct(tally.within_t1),
                pct_within_t2: tally.pct(tally.within_t2),
            })
            .collect())
    }

    /// Per-school reachability over the distinct (zone, school) demand pairs.
    ///
    /// Rows are ordered by school id.
    pub fn school_rows(
        &self,
        demand: &[ZoneDemand],
        threshold_min: f64,
        threshold2_min: f64,
    ) -> Result<Vec<SchoolKpiRow>, GraphError> {
        let rows = self.zone_school_rows(demand, threshold_min, threshold2_min)?;

        let mut per_school: BTreeMap<&SchoolId, PairTally> = BTreeMap::new();
        for row in &rows {
            per_school.entry(&row.school_id).or_default().add(row);
        }

        Ok(per_school
            .into_iter()
            .map(|(school, tally)| SchoolKpiRow {
                school_id: school.clone(),
                zone_pairs: tally.pairs,
                reachable_pairs: tally.reachable,
                pairs_within_t1: tally.within_t1,
                pairs_within_t2: tally.within_t2,
                pct_within_t1: tally.pct(tally.within_t1),
                pct_within_t2: tally.pct(tally.within_t2),
            })
            .collect())
    }

    pub(crate) fn nearest_time_at(&self, slot: usize) -> Option<f64> {
        self.view
            .edges_at(slot)
            .map(|e| e.walk_time_min)
            .min_by(f64::total_cmp)
    }

    pub(crate) fn covered_at(&self, slot: usize, threshold_min: f64) -> bool {
        self.view
            .edges_at(slot)
            .any(|e| e.walk_time_min <= threshold_min)
    }

    fn aggregate_slots(
        &self,
        slots: impl IntoIterator<Item = usize>,
        threshold_min: f64,
        threshold2_min: f64,
        weighting: Weighting,
    ) -> AggregateKpis {
        let zones = self.view.zones();
        let slots: Vec<usize> = slots.into_iter().collect();

        // All-zero student counts would leave every percentage undefined.
        let weighting = if slots.iter().all(|&slot| weighting.weight(&zones[slot]) <= 0.0) {
            Weighting::Uniform
        } else {
            weighting
        };

        let mut count = 0usize;
        let mut total = 0.0;
        let mut within_t1 = 0.0;
        let mut within_t2 = 0.0;
        let mut uncovered = 0.0;
        let mut covered_times: Vec<(f64, f64)> = Vec::new();

        for slot in slots {
            let weight = weighting.weight(&zones[slot]);
            count += 1;
            total += weight;

            match self.nearest_time_at(slot) {
                None => uncovered += weight,
                Some(t) => {
                    if t <= threshold_min {
                        within_t1 += weight;
                    }
                    if t <= threshold2_min {
                        within_t2 += weight;
                    }
                    covered_times.push((t, weight));
                }
            }
        }

        if count == 0 {
            return AggregateKpis::empty();
        }

        AggregateKpis {
            zones: count,
            total_weight: total,
            pct_covered_t1: percent(within_t1, total),
            pct_covered_t2: percent(within_t2, total),
            pct_uncovered: percent(uncovered, total),
            mean_time_covered: weighted_mean(&covered_times),
            median_time_covered: weighted_median(covered_times),
        }
    }
}

/// Pair counts for one zone or one school.
#[derive(Debug, Default)]
struct PairTally {
    pairs: usize,
    reachable: usize,
    within_t1: usize,
    within_t2: usize,
}

impl PairTally {
    fn add(&mut self, row: &ZoneSchoolRow) {
        self.pairs += 1;
        self.reachable += usize::from(row.school_reach_min.is_some());
        self.within_t1 += usize::from(row.within_t1);
        self.within_t2 += usize::from(row.within_t2);
    }

    fn pct(&self, count: usize) -> f64 {
        percent(count as f64, self.pairs as f64)
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

fn weighted_mean(samples: &[(f64, f64)]) -> Option<f64> {
    let weight: f64 = samples.iter().map(|(_, w)| w).sum();
    if weight <= 0.0 {
        return None;
    }
    Some(samples.iter().map(|(t, w)| t * w).sum::<f64>() / weight)
}

/// Weighted median; with equal weights this is the ordinary median,
/// averaging the two middle values for an even count.
fn weighted_median(mut samples: Vec<(f64, f64)>) -> Option<f64> {
    samples.retain(|(_, w)| *w > 0.0);
    if samples.is_empty() {
        return None;
    }
    samples.sort_by(|a, b| a.0.total_cmp(&b.0));

    let half = samples.iter().map(|(_, w)| w).sum::<f64>() / 2.0;
    let mut cumulative = 0.0;
    for (i, (t, w)) in samples.iter().enumerate() {
        cumulative += w;
        if cumulative > half {
            return Some(*t);
        }
        if cumulative == half {
            return Some(samples.get(i + 1).map_or(*t, |next| (t + next.0) / 2.0));
        }
    }
    samples.last().map(|(t, _)| *t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Zone;
    use crate::graph::AccessGraph;
    use crate::graph::test_support::*;

    /// Zones spaced 10 km apart, each with an optional stop at the given
    /// walking time.
    fn spaced_graph(times: &[Option<f64>]) -> AccessGraph {
        let mut zones = Vec::new();
        let mut stops = Vec::new();
        for (i, time) in times.iter().enumerate() {
            let base = i as f64 * 10_000.0;
            zones.push(zone_at(&format!("Z{i}"), base));
            if let Some(t) = time {
                stops.push(stop_at(&format!("S{i}"), base + meters_for_minutes(*t)));
            }
        }
        if stops.is_empty() {
            stops.push(stop_at("far", 1_000_000.0));
        }
        AccessGraph::build(zones, stops, params()).unwrap()
    }

    #[test]
    fn two_zone_scenario() {
        // A is 5 minutes from a stop, B has none in reach.
        let graph = AccessGraph::build(
            vec![zone_at("A", 0.0), zone_at("B", 10_000.0)],
            vec![stop_at("S1", meters_for_minutes(5.0))],
            params(),
        )
        .unwrap();
        let metrics = AccessMetrics::new(&graph);

        assert!(metrics.coverage(&code("A"), 10.0).unwrap());
        assert!(!metrics.coverage(&code("B"), 10.0).unwrap());
        assert_eq!(metrics.nearest_time(&code("A")).unwrap(), Some(5.0));
        assert_eq!(metrics.nearest_time(&code("B")).unwrap(), None);

        let summary = metrics.aggregate_all(10.0, 15.0, Weighting::Uniform);
        assert_eq!(summary.pct_covered_t1, 50.0);
        assert_eq!(summary.pct_uncovered, 50.0);
    }

    #[test]
    fn mean_and_median_exclude_uncovered() {
        let graph = spaced_graph(&[Some(4.0), Some(6.0), Some(8.0), None, None]);
        let metrics = AccessMetrics::new(&graph);

        let summary = metrics.aggregate_all(10.0, 15.0, Weighting::Uniform);

        assert_eq!(summary.zones, 5);
        assert_eq!(summary.mean_time_covered, Some(6.0));
        assert_eq!(summary.median_time_covered, Some(6.0));
        assert_eq!(summary.pct_covered_t1, 60.0);
        assert_eq!(summary.pct_uncovered, 40.0);
    }

    #[test]
    fn thresholds_are_inclusive_and_independent() {
        // 11.0 minutes: outside t1=10, inside t2=15
        let graph = spaced_graph(&[Some(11.0), Some(10.0)]);
        let metrics = AccessMetrics::new(&graph);

        assert!(!metrics.coverage(&code("Z0"), 10.0).unwrap());
        assert!(metrics.coverage(&code("Z0"), 15.0).unwrap());
        assert!(metrics.coverage(&code("Z1"), 10.0).unwrap());

        let summary = metrics.aggregate_all(10.0, 15.0, Weighting::Uniform);
        assert_eq!(summary.pct_covered_t1, 50.0);
        assert_eq!(summary.pct_covered_t2, 100.0);
        assert_eq!(summary.pct_uncovered, 0.0);
    }

    #[test]
    fn even_count_median_averages_middle_pair() {
        let graph = spaced_graph(&[Some(2.0), Some(4.0), Some(6.0), Some(10.0)]);
        let summary = AccessMetrics::new(&graph).aggregate_all(10.0, 15.0, Weighting::Uniform);
        assert_eq!(summary.median_time_covered, Some(5.0));
        assert_eq!(summary.mean_time_covered, Some(5.5));
    }

    #[test]
    fn student_weighting() {
        let zones = vec![
            zone_at("A", 0.0).with_students(30),
            zone_at("B", 10_000.0).with_students(10),
        ];
        let graph = AccessGraph::build(
            zones,
            vec![stop_at("S1", meters_for_minutes(4.0))],
            params(),
        )
        .unwrap();
        let metrics = AccessMetrics::new(&graph);

        let summary = metrics.aggregate_all(10.0, 15.0, Weighting::Students);
        assert_eq!(summary.total_weight, 40.0);
        assert_eq!(summary.pct_covered_t1, 75.0);
        assert_eq!(summary.pct_uncovered, 25.0);

        let uniform = metrics.aggregate_all(10.0, 15.0, Weighting::Uniform);
        assert_eq!(uniform.pct_covered_t1, 50.0);
    }

    #[test]
    fn aggregate_subset_and_unknown_zone() {
        let graph = spaced_graph(&[Some(4.0), None]);
        let metrics = AccessMetrics::new(&graph);

        let subset = metrics
            .aggregate(&[code("Z0")], 10.0, 15.0, Weighting::Uniform)
            .unwrap();
        assert_eq!(subset.pct_covered_t1, 100.0);

        let err = metrics
            .aggregate(&[code("Z0"), code("nope")], 10.0, 15.0, Weighting::Uniform)
            .unwrap_err();
        assert_eq!(err, GraphError::UnknownZone(code("nope")));
    }

    #[test]
    fn empty_population() {
        let graph = AccessGraph::build(Vec::<Zone>::new(), vec![stop_at("S", 0.0)], params())
            .unwrap();
        let summary = AccessMetrics::new(&graph).aggregate_all(10.0, 15.0, Weighting::Uniform);
        assert_eq!(summary, AggregateKpis::empty());
    }

    #[test]
    fn school_reach_only_counts_serving_stops() {
        let graph = AccessGraph::build(
            vec![zone_at("A", 0.0)],
            vec![
                stop_at("plain", meters_for_minutes(1.0)),
                school_stop_at("X1", meters_for_minutes(7.0), &["X"]),
                school_stop_at("X2", meters_for_minutes(9.0), &["X", "Y"]),
            ],
            params(),
        )
        .unwrap();
        let metrics = AccessMetrics::new(&graph);

        assert_eq!(metrics.nearest_time(&code("A")).unwrap(), Some(1.0));
        assert_eq!(metrics.school_reach(&code("A"), &school("X")).unwrap(), Some(7.0));
        assert_eq!(metrics.school_reach(&code("A"), &school("Y")).unwrap(), Some(9.0));
        assert_eq!(metrics.school_reach(&code("A"), &school("Z")).unwrap(), None);
        assert!(metrics.school_reach(&code("B"), &school("X")).is_err());
    }

    #[test]
    fn zone_rows_report_uncovered_as_none() {
        let mut zones = vec![zone_at("A", 0.0)];
        zones.push(zone_at("B", 10_000.0).approximated());
        let graph = AccessGraph::build(
            zones,
            vec![stop_at("S1", meters_for_minutes(11.0))],
            params(),
        )
        .unwrap();

        let rows = AccessMetrics::new(&graph).zone_rows(10.0, 15.0);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].nearest_time_min, Some(11.0));
        assert!(!rows[0].covered_threshold1);
        assert!(rows[0].covered_threshold2);
        assert_eq!(rows[1].nearest_time_min, None);
        assert!(rows[1].approximated);

        let json = serde_json::to_value(&rows[1]).unwrap();
        assert!(json["nearest_time_min"].is_null());
    }

    #[test]
    fn school_rows_deduplicate_pairs() {
        let graph = AccessGraph::build(
            vec![zone_at("A", 0.0), zone_at("B", 10_000.0)],
            vec![school_stop_at("X1", meters_for_minutes(11.0), &["X"])],
            params(),
        )
        .unwrap();
        let demand = vec![
            ZoneDemand { zone: code("A"), school: school("X"), students: Some(3) },
            ZoneDemand { zone: code("A"), school: school("X"), students: Some(1) },
            ZoneDemand { zone: code("B"), school: school("X"), students: None },
            ZoneDemand { zone: code("A"), school: school("Y"), students: None },
        ];

        let rows = AccessMetrics::new(&graph)
            .school_rows(&demand, 10.0, 15.0)
            .unwrap();

        assert_eq!(rows.len(), 2);
        let x = &rows[0];
        assert_eq!(x.school_id, school("X"));
        assert_eq!(x.zone_pairs, 2);
        assert_eq!(x.reachable_pairs, 1);
        assert_eq!(x.pairs_within_t1, 0);
        assert_eq!(x.pairs_within_t2, 1);
        assert_eq!(x.pct_within_t2, 50.0);
        assert_eq!(rows[1].reachable_pairs, 0);
    }

    #[test]
    fn zone_school_rows_per_demand_pair() {
        let graph = AccessGraph::build(
            vec![zone_at("A", 0.0), zone_at("B", 10_000.0)],
            vec![
                school_stop_at("X1", meters_for_minutes(8.0), &["X"]),
                school_stop_at("Y1", meters_for_minutes(11.0), &["Y"]),
            ],
            params(),
        )
        .unwrap();
        let demand = vec![
            ZoneDemand { zone: code("B"), school: school("X"), students: Some(2) },
            ZoneDemand { zone: code("A"), school: school("Y"), students: Some(4) },
            ZoneDemand { zone: code("A"), school: school("X"), students: Some(1) },
            ZoneDemand { zone: code("A"), school: school("X"), students: Some(6) },
            ZoneDemand { zone: code("A"), school: school("Z"), students: None },
        ];
        let metrics = AccessMetrics::new(&graph);

        let rows = metrics.zone_school_rows(&demand, 10.0, 15.0).unwrap();
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.zone_code.as_str(), r.school_id.as_str()))
            .collect();
        assert_eq!(keys, vec![("A", "X"), ("A", "Y"), ("A", "Z"), ("B", "X")]);

        assert_eq!(rows[0].school_reach_min, Some(8.0));
        assert!(rows[0].within_t1 && rows[0].within_t2);
        assert_eq!(rows[1].school_reach_min, Some(11.0));
        assert!(!rows[1].within_t1 && rows[1].within_t2);
        assert_eq!(rows[2].school_reach_min, None);
        assert!(!rows[2].within_t2);
        assert_eq!(rows[3].school_reach_min, None);

        let zones = metrics.zone_pair_rows(&demand, 10.0, 15.0).unwrap();
        assert_eq!(zones.len(), 2);
        let a = &zones[0];
        assert_eq!(a.zone_code, code("A"));
        assert_eq!((a.pairs, a.reachable_pairs), (3, 2));
        assert_eq!((a.pairs_within_t1, a.pairs_within_t2), (1, 2));
        assert!((a.pct_within_t1 - 100.0 / 3.0).abs() < 1e-9);
        assert!((a.pct_within_t2 - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(zones[1].pairs, 1);
        assert_eq!(zones[1].pct_within_t2, 0.0);
    }

    #[test]
    fn zone_school_rows_reject_unknown_zone() {
        let graph = spaced_graph(&[Some(4.0)]);
        let demand = vec![ZoneDemand { zone: code("nope"), school: school("X"), students: None }];
        let err = AccessMetrics::new(&graph)
            .zone_school_rows(&demand, 10.0, 15.0)
            .unwrap_err();
        assert_eq!(err, GraphError::UnknownZone(code("nope")));
    }

    #[test]
    fn all_zero_student_counts_count_zones_uniformly() {
        let zones = vec![
            zone_at("A", 0.0).with_students(0),
            zone_at("B", 10_000.0).with_students(0),
        ];
        let graph = AccessGraph::build(
            zones,
            vec![stop_at("S1", meters_for_minutes(4.0))],
            params(),
        )
        .unwrap();

        let summary = AccessMetrics::new(&graph).aggregate_all(10.0, 15.0, Weighting::Students);
        assert_eq!(summary.total_weight, 2.0);
        assert_eq!(summary.pct_covered_t1, 50.0);
        assert_eq!(summary.pct_uncovered, 50.0);
        assert_eq!(summary.mean_time_covered, Some(4.0));
    }

    #[test]
    fn metrics_see_snapshot_stops() {
        let graph = spaced_graph(&[Some(4.0), None]);
        let snapshot = graph
            .snapshot()
            .with_stop(candidate_at("QW-0001", 10_000.0 + meters_for_minutes(3.0)));

        let base = AccessMetrics::new(&graph);
        let overlay = AccessMetrics::new(&snapshot);

        assert_eq!(base.nearest_time(&code("Z1")).unwrap(), None);
        assert_eq!(overlay.nearest_time(&code("Z1")).unwrap(), Some(3.0));
    }

    #[test]
    fn weighted_median_helper() {
        assert_eq!(weighted_median(vec![]), None);
        assert_eq!(weighted_median(vec![(3.0, 0.0)]), None);
        assert_eq!(weighted_median(vec![(1.0, 1.0), (9.0, 5.0)]), Some(9.0));
        assert_eq!(weighted_median(vec![(1.0, 2.0), (9.0, 2.0)]), Some(5.0));
    }
}
