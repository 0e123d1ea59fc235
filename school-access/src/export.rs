//! Writing report tables to the output directory.
//!
//! Files written:
//!
//! - `zone_kpis.csv`, `zone_kpis.json`
//! - `school_kpis.csv`
//! - `zone_school_walktimes.csv`: one row per (zone, school) demand pair
//! - `zone_school_kpis.csv`: those pairs rolled up per zone
//! - `summary.json`: parameters, aggregate KPIs and projected KPIs
//! - `quick_wins.csv`, `quick_wins.json` (when a search was run)
//! - `stops.csv`: one row per stop-school association, or one bare row for
//!   a stop with no school

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::domain::{Stop, StopKind};
use crate::metrics::AggregateKpis;
use crate::optimizer::QuickWin;
use crate::pipeline::AnalysisReport;

/// Errors from writing report files.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A stop and one school it serves, as written to `stops.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopRow {
    pub stop_id: String,
    pub lat: f64,
    pub lon: f64,
    pub candidate: bool,
    pub school_id: Option<String>,
    pub match_confidence: Option<f64>,
}

/// Flatten stops into association rows, ordered as given.
pub fn stop_rows(stops: &[Stop]) -> Vec<StopRow> {
    let mut rows = Vec::with_capacity(stops.len());
    for stop in stops {
        let base = StopRow {
            stop_id: stop.id.as_str().to_string(),
            lat: stop.coord.lat(),
            lon: stop.coord.lon(),
            candidate: stop.kind == StopKind::Candidate,
            school_id: None,
            match_confidence: None,
        };
        if stop.schools.is_empty() {
            rows.push(base);
            continue;
        }
        for (school, confidence) in &stop.schools {
            rows.push(StopRow {
                school_id: Some(school.as_str().to_string()),
                match_confidence: Some(*confidence),
                ..base.clone()
            });
        }
    }
    rows
}

/// Quick-win row with list columns joined by `;`.
#[derive(Debug, Serialize)]
struct QuickWinCsvRow<'a> {
    rank: usize,
    candidate_id: &'a str,
    lat: f64,
    lon: f64,
    origin_zone: &'a str,
    schools: String,
    zones_newly_covered: String,
    students_served: u64,
    marginal_gain: f64,
    cumulative_gain: f64,
}

impl<'a> From<&'a QuickWin> for QuickWinCsvRow<'a> {
    fn from(pick: &'a QuickWin) -> Self {
        Self {
            rank: pick.rank,
            candidate_id: pick.candidate_id.as_str(),
            lat: pick.coord.lat(),
            lon: pick.coord.lon(),
            origin_zone: pick.origin_zone.as_str(),
            schools: join(pick.schools.iter().map(|s| s.as_str())),
            zones_newly_covered: join(pick.zones_newly_covered.iter().map(|z| z.as_str())),
            students_served: pick.students_served,
            marginal_gain: pick.marginal_gain,
            cumulative_gain: pick.cumulative_gain,
        }
    }
}

fn join<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(";")
}

#[derive(Debug, Serialize)]
struct SummaryDoc<'a> {
    parameters: &'a AnalysisConfig,
    kpis: &'a AggregateKpis,
    zones_approximated: usize,
    projected: Option<&'a AggregateKpis>,
}

fn write_csv<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "wrote CSV");
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExportError> {
    let io_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush().map_err(io_error)?;
    debug!(path = %path.display(), "wrote JSON");
    Ok(())
}

/// Write every table of `report` under `out_dir`, creating it if needed.
///
/// Returns the paths written, in the order listed in the module docs.
pub fn write_report(report: &AnalysisReport, out_dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(out_dir).map_err(|source| ExportError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::new();
    let mut path_for = |name: &str| {
        let path = out_dir.join(name);
        written.push(path.clone());
        path
    };

    write_csv(&path_for("zone_kpis.csv"), &report.zones)?;
    write_json(&path_for("zone_kpis.json"), &report.zones)?;
    write_csv(&path_for("school_kpis.csv"), &report.schools)?;
    write_csv(&path_for("zone_school_walktimes.csv"), &report.zone_schools)?;
    write_csv(&path_for("zone_school_kpis.csv"), &report.zone_pairs)?;

    let summary = SummaryDoc {
        parameters: &report.parameters,
        kpis: &report.summary,
        zones_approximated: report.zones.iter().filter(|z| z.approximated).count(),
        projected: report.quick_wins.as_ref().map(|plan| &plan.projected),
    };
    write_json(&path_for("summary.json"), &summary)?;

    if let Some(plan) = &report.quick_wins {
        write_csv(
            &path_for("quick_wins.csv"),
            plan.picks.iter().map(QuickWinCsvRow::from),
        )?;
        write_json(&path_for("quick_wins.json"), plan)?;
    }

    write_csv(&path_for("stops.csv"), &report.stops)?;

    info!(dir = %out_dir.display(), files = written.len(), "exported report");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ZoneDemand;
    use crate::graph::test_support::*;
    use crate::ingest::Dataset;
    use crate::pipeline::Analysis;
    use tempfile::tempdir;

    fn report(max_new_stops: usize) -> AnalysisReport {
        let dataset = Dataset {
            centroids: Some(vec![
                zone_at("A", 0.0),
                zone_at("B", 10_000.0),
                zone_at("C", 10_300.0),
            ]),
            stops: vec![
                school_stop_at("S1", meters_for_minutes(5.0), &["North High", "Dickson College"]),
                stop_at("S2", 50_000.0),
            ],
            demand: vec![
                demand("A", "North High"),
                demand("B", "North High"),
                demand("A", "Dickson College"),
            ],
        };
        let mut config = AnalysisConfig::default();
        config.max_new_stops = max_new_stops;
        Analysis::prepare(dataset, config).unwrap().report().unwrap()
    }

    fn demand(zone: &str, school_name: &str) -> ZoneDemand {
        ZoneDemand {
            zone: code(zone),
            school: school(school_name),
            students: None,
        }
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn stop_rows_flatten_schools() {
        let stops = vec![
            school_stop_at("S1", 0.0, &["North High", "Dickson College"]),
            stop_at("S2", 100.0),
            candidate_at("QW-0001", 200.0),
        ];
        let rows = stop_rows(&stops);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].school_id.as_deref(), Some("Dickson College"));
        assert_eq!(rows[1].school_id.as_deref(), Some("North High"));
        assert_eq!(rows[1].match_confidence, Some(90.0));
        assert_eq!(rows[2].stop_id, "S2");
        assert_eq!(rows[2].school_id, None);
        assert!(rows[3].candidate);
    }

    #[test]
    fn writes_all_tables() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("output");
        let written = write_report(&report(2), &out).unwrap();

        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "zone_kpis.csv",
                "zone_kpis.json",
                "school_kpis.csv",
                "zone_school_walktimes.csv",
                "zone_school_kpis.csv",
                "summary.json",
                "quick_wins.csv",
                "quick_wins.json",
                "stops.csv",
            ]
        );
        assert!(written.iter().all(|p| p.exists()));

        let zones = read(&out.join("zone_kpis.csv"));
        let mut lines = zones.lines();
        assert_eq!(
            lines.next(),
            Some("zone_code,nearest_time_min,covered_threshold1,covered_threshold2,approximated")
        );
        assert_eq!(lines.next(), Some("A,5.0,true,true,false"));
        assert_eq!(lines.next(), Some("B,,false,false,false"));

        let stops = read(&out.join("stops.csv"));
        assert_eq!(stops.lines().count(), 4);
    }

    #[test]
    fn zone_school_tables() {
        let dir = tempdir().unwrap();
        write_report(&report(0), dir.path()).unwrap();

        let pairs = read(&dir.path().join("zone_school_walktimes.csv"));
        assert_eq!(
            pairs.lines().collect::<Vec<_>>(),
            vec![
                "zone_code,school_id,school_reach_min,within_t1,within_t2",
                "A,Dickson College,5.0,true,true",
                "A,North High,5.0,true,true",
                "B,North High,,false,false",
            ]
        );

        let zones = read(&dir.path().join("zone_school_kpis.csv"));
        assert_eq!(
            zones.lines().collect::<Vec<_>>(),
            vec![
                "zone_code,pairs,reachable_pairs,pairs_within_t1,pairs_within_t2,\
                 pct_within_t1,pct_within_t2",
                "A,2,2,2,2,100.0,100.0",
                "B,1,0,0,0,0.0,0.0",
            ]
        );
    }

    #[test]
    fn quick_win_csv_joins_zone_lists() {
        let dir = tempdir().unwrap();
        write_report(&report(2), dir.path()).unwrap();

        let csv = read(&dir.path().join("quick_wins.csv"));
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some(
                "rank,candidate_id,lat,lon,origin_zone,schools,zones_newly_covered,\
                 students_served,marginal_gain,cumulative_gain"
            )
        );
        let first = lines.next().unwrap();
        assert!(first.starts_with("1,QW-0001,"));
        assert!(first.contains(",B;C,"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn summary_includes_parameters_and_projection() {
        let dir = tempdir().unwrap();
        write_report(&report(2), dir.path()).unwrap();

        let summary: serde_json::Value =
            serde_json::from_str(&read(&dir.path().join("summary.json"))).unwrap();
        assert_eq!(summary["parameters"]["walk_radius_m"], 900.0);
        assert_eq!(summary["kpis"]["zones"], 3);
        assert_eq!(summary["projected"]["pct_covered_t1"], 100.0);
        assert_eq!(summary["zones_approximated"], 0);
    }

    #[test]
    fn zero_budget_skips_quick_win_files() {
        let dir = tempdir().unwrap();
        let written = write_report(&report(0), dir.path()).unwrap();

        assert_eq!(written.len(), 7);
        assert!(!dir.path().join("quick_wins.csv").exists());

        let summary: serde_json::Value =
            serde_json::from_str(&read(&dir.path().join("summary.json"))).unwrap();
        assert!(summary["projected"].is_null());
    }
}
