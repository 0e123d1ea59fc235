//! One-pass analysis over a loaded dataset.
//!
//! Zones come from the centroid file when present and are approximated from
//! the stops otherwise. The access graph is built once; KPIs and quick-win
//! searches are all read off that graph.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{AnalysisConfig, ConfigError};
use crate::domain::{ZoneCode, ZoneDemand};
use crate::export::{ExportError, StopRow, stop_rows};
use crate::graph::{AccessGraph, GraphError, approximate_zones};
use crate::ingest::{Dataset, IngestError, load_inputs};
use crate::metrics::{
    AccessMetrics, AggregateKpis, SchoolKpiRow, ZoneKpiRow, ZonePairKpiRow, ZoneSchoolRow,
};
use crate::optimizer::{OptimizeError, QuickWinConfig, QuickWinOptimizer, QuickWinPlan};

/// Errors from any stage of an analysis run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Optimize(#[from] OptimizeError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Every table produced by one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub parameters: AnalysisConfig,
    pub zones: Vec<ZoneKpiRow>,
    pub summary: AggregateKpis,
    pub schools: Vec<SchoolKpiRow>,
    /// School walking time per (zone, school) demand pair.
    pub zone_schools: Vec<ZoneSchoolRow>,
    pub zone_pairs: Vec<ZonePairKpiRow>,
    /// `None` when the run was configured with a zero stop budget.
    pub quick_wins: Option<QuickWinPlan>,
    pub stops: Vec<StopRow>,
}

/// A built access graph with the demand and parameters it was built for.
#[derive(Debug)]
pub struct Analysis {
    config: AnalysisConfig,
    graph: AccessGraph,
    demand: Vec<ZoneDemand>,
}

impl Analysis {
    /// Load the inputs under `data_dir` and build the graph.
    pub fn load(data_dir: &Path, config: AnalysisConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let inputs = load_inputs(data_dir, config.match_score_cutoff)?;
        Self::prepare(inputs.dataset, config)
    }

    /// Build the graph for an already assembled dataset.
    ///
    /// Demand records naming a zone that has no centroid are dropped with a
    /// warning.
    pub fn prepare(dataset: Dataset, config: AnalysisConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let Dataset {
            centroids,
            stops,
            demand,
        } = dataset;

        let zones = match centroids {
            Some(zones) => zones,
            None => approximate_zones(&demand, &stops)?,
        };

        let known: HashSet<&ZoneCode> = zones.iter().map(|z| &z.code).collect();
        let total = demand.len();
        let demand: Vec<ZoneDemand> = demand
            .into_iter()
            .filter(|d| known.contains(&d.zone))
            .collect();
        if demand.len() < total {
            warn!(
                dropped = total - demand.len(),
                "demand records name zones without a centroid"
            );
        }

        let graph = AccessGraph::build(zones, stops, config.walk_params())?;
        Ok(Self {
            config,
            graph,
            demand,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn graph(&self) -> &AccessGraph {
        &self.graph
    }

    pub fn demand(&self) -> &[ZoneDemand] {
        &self.demand
    }

    pub fn zone_rows(&self) -> Vec<ZoneKpiRow> {
        AccessMetrics::new(&self.graph)
            .zone_rows(self.config.threshold_min, self.config.threshold2_min)
    }

    pub fn summary(&self) -> AggregateKpis {
        AccessMetrics::new(&self.graph).aggregate_all(
            self.config.threshold_min,
            self.config.threshold2_min,
            self.config.weighting,
        )
    }

    pub fn school_rows(&self) -> Result<Vec<SchoolKpiRow>, GraphError> {
        AccessMetrics::new(&self.graph).school_rows(
            &self.demand,
            self.config.threshold_min,
            self.config.threshold2_min,
        )
    }

    pub fn zone_school_rows(&self) -> Result<Vec<ZoneSchoolRow>, GraphError> {
        AccessMetrics::new(&self.graph).zone_school_rows(
            &self.demand,
            self.config.threshold_min,
            self.config.threshold2_min,
        )
    }

    pub fn zone_pair_rows(&self) -> Result<Vec<ZonePairKpiRow>, GraphError> {
        AccessMetrics::new(&self.graph).zone_pair_rows(
            &self.demand,
            self.config.threshold_min,
            self.config.threshold2_min,
        )
    }

    /// Run a quick-win search with explicit parameters.
    pub fn quick_wins(&self, search: QuickWinConfig) -> Result<QuickWinPlan, OptimizeError> {
        QuickWinOptimizer::new(&self.graph, search).run()
    }

    /// Compute every report table with the configured parameters.
    pub fn report(&self) -> Result<AnalysisReport, PipelineError> {
        let zones = self.zone_rows();
        let summary = self.summary();
        let schools = self.school_rows()?;
        let zone_schools = self.zone_school_rows()?;
        let zone_pairs = self.zone_pair_rows()?;

        let quick_wins = if self.config.max_new_stops == 0 {
            info!("stop budget is zero; skipping quick-win search");
            None
        } else {
            Some(self.quick_wins(self.config.quick_win_config())?)
        };

        info!(
            zones = zones.len(),
            schools = schools.len(),
            pct_covered_t1 = summary.pct_covered_t1,
            pct_covered_t2 = summary.pct_covered_t2,
            picks = quick_wins.as_ref().map(|p| p.picks.len()),
            "analysis complete"
        );

        Ok(AnalysisReport {
            parameters: self.config.clone(),
            zones,
            summary,
            schools,
            zone_schools,
            zone_pairs,
            quick_wins,
            stops: stop_rows(self.graph.stops()),
        })
    }
}

/// Load, analyse and report in one call.
pub fn run(data_dir: &Path, config: AnalysisConfig) -> Result<AnalysisReport, PipelineError> {
    Analysis::load(data_dir, config)?.report()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::*;

    fn demand(zone: &str, school_name: &str, students: Option<u32>) -> ZoneDemand {
        ZoneDemand {
            zone: code(zone),
            school: school(school_name),
            students,
        }
    }

    fn two_zone_dataset() -> Dataset {
        Dataset {
            centroids: Some(vec![zone_at("A", 0.0), zone_at("B", 10_000.0)]),
            stops: vec![school_stop_at("S1", meters_for_minutes(5.0), &["North High"])],
            demand: vec![
                demand("A", "North High", Some(3)),
                demand("B", "North High", Some(4)),
                demand("Z", "North High", Some(9)),
            ],
        }
    }

    #[test]
    fn two_zone_report() {
        let analysis = Analysis::prepare(two_zone_dataset(), AnalysisConfig::default()).unwrap();
        assert_eq!(analysis.demand().len(), 2);

        let report = analysis.report().unwrap();
        assert_eq!(report.zones.len(), 2);
        assert_eq!(report.zones[0].nearest_time_min, Some(5.0));
        assert!(report.zones[0].covered_threshold1);
        assert_eq!(report.zones[1].nearest_time_min, None);
        assert_eq!(report.summary.pct_covered_t1, 50.0);

        assert_eq!(report.schools.len(), 1);
        assert_eq!(report.schools[0].zone_pairs, 2);
        assert_eq!(report.schools[0].pairs_within_t1, 1);

        assert_eq!(report.zone_schools.len(), 2);
        assert_eq!(report.zone_schools[0].school_reach_min, Some(5.0));
        assert_eq!(report.zone_schools[1].school_reach_min, None);
        assert_eq!(report.zone_pairs.len(), 2);
        assert_eq!(report.zone_pairs[0].pct_within_t1, 100.0);
        assert_eq!(report.zone_pairs[1].pct_within_t1, 0.0);

        let plan = report.quick_wins.unwrap();
        assert_eq!(plan.picks.len(), 1);
        assert_eq!(plan.picks[0].zones_newly_covered, vec![code("B")]);
        assert_eq!(plan.projected.pct_covered_t1, 100.0);

        assert_eq!(report.stops.len(), 1);
    }

    #[test]
    fn zero_budget_skips_search() {
        let mut config = AnalysisConfig::default();
        config.max_new_stops = 0;
        let report = Analysis::prepare(two_zone_dataset(), config)
            .unwrap()
            .report()
            .unwrap();
        assert!(report.quick_wins.is_none());
    }

    #[test]
    fn explicit_search_rejects_zero_budget() {
        let analysis = Analysis::prepare(two_zone_dataset(), AnalysisConfig::default()).unwrap();
        let err = analysis.quick_wins(QuickWinConfig::new(10.0, 15.0, 0)).unwrap_err();
        assert_eq!(err, OptimizeError::InvalidBudget(0));
    }

    #[test]
    fn approximates_zones_without_centroids() {
        let dataset = Dataset {
            centroids: None,
            stops: vec![
                school_stop_at("S1", 0.0, &["North High"]),
                school_stop_at("S2", 5_000.0, &["South High"]),
            ],
            demand: vec![
                demand("A", "North High", Some(3)),
                demand("B", "South High", None),
            ],
        };

        let report = Analysis::prepare(dataset, AnalysisConfig::default())
            .unwrap()
            .report()
            .unwrap();
        assert_eq!(report.zones.len(), 2);
        assert!(report.zones.iter().all(|z| z.approximated));
        assert!(report.zones.iter().all(|z| z.nearest_time_min == Some(0.0)));
        assert_eq!(report.summary.pct_covered_t1, 100.0);
        assert_eq!(report.quick_wins.unwrap().picks.len(), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = AnalysisConfig::default();
        config.walk_radius_m = -1.0;
        let err = Analysis::prepare(two_zone_dataset(), config).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn no_stops_is_fatal() {
        let dataset = Dataset {
            centroids: None,
            stops: vec![],
            demand: vec![demand("A", "North High", None)],
        };
        let err = Analysis::prepare(dataset, AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Graph(GraphError::EmptyInput)));
    }

    #[test]
    fn report_is_deterministic() {
        let analysis = Analysis::prepare(two_zone_dataset(), AnalysisConfig::default()).unwrap();
        assert_eq!(analysis.report().unwrap(), analysis.report().unwrap());
    }
}
