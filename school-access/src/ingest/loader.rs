//! Reading input files from the data directory.
//!
//! Layout, relative to the data directory:
//!
//! - `raw/school_bus_services.json`: stop rows with route text
//! - `raw/students_distance_sa1.json`: zone/school demand rows
//! - `manual/sa1_centroids.csv` (optional): `sa1_code_2021, lon, lat`
//!   and an optional `student_count`

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::domain::{SchoolId, ZoneSource};
use crate::matching::SchoolMatcher;

use super::dataset::Dataset;
use super::error::IngestError;
use super::raw::{RawRow, bus_service_rows, match_associations, student_records};
use super::records::{AssociationRecord, ZoneRecord};

pub const BUS_SERVICES_FILE: &str = "raw/school_bus_services.json";
pub const STUDENTS_FILE: &str = "raw/students_distance_sa1.json";
pub const CENTROIDS_FILE: &str = "manual/sa1_centroids.csv";

/// Everything read from the data directory.
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub dataset: Dataset,
    /// Headsign matches, one per (stop, school) pair.
    pub associations: Vec<AssociationRecord>,
}

/// One row of the centroid CSV.
#[derive(Debug, Deserialize)]
struct CentroidRow {
    #[serde(alias = "sa1_code", alias = "code")]
    sa1_code_2021: String,
    lon: f64,
    lat: f64,
    #[serde(default)]
    student_count: Option<u32>,
}

/// Read a JSON array of row objects, as written by the download command.
pub fn read_json_rows(path: &Path) -> Result<Vec<RawRow>, IngestError> {
    let contents = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|e| IngestError::Json {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read authoritative zone centroids from CSV.
pub fn read_centroids_csv(path: &Path) -> Result<Vec<ZoneRecord>, IngestError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    reader
        .deserialize::<CentroidRow>()
        .map(|row| {
            let row = row?;
            Ok::<_, IngestError>(ZoneRecord {
                code: row.sa1_code_2021,
                lat: row.lat,
                lon: row.lon,
                student_count: row.student_count,
                source: ZoneSource::Authoritative,
            })
        })
        .collect()
}

fn require(path: PathBuf) -> Result<PathBuf, IngestError> {
    if path.exists() {
        Ok(path)
    } else {
        Err(IngestError::MissingFile {
            path,
            hint: "run the download command first",
        })
    }
}

/// Load, match and assemble the inputs under `data_dir`.
///
/// School names come from the students-distance table; route text is
/// matched against them with `match_score_cutoff`.
pub fn load_inputs(data_dir: &Path, match_score_cutoff: f64) -> Result<LoadedInputs, IngestError> {
    let bus_rows = read_json_rows(&require(data_dir.join(BUS_SERVICES_FILE))?)?;
    let student_rows = read_json_rows(&require(data_dir.join(STUDENTS_FILE))?)?;

    let centroids_path = data_dir.join(CENTROIDS_FILE);
    let centroids = if centroids_path.exists() {
        Some(read_centroids_csv(&centroids_path)?)
    } else {
        info!(
            path = %centroids_path.display(),
            "no centroid file; zones will be approximated from stops"
        );
        None
    };

    let services = bus_service_rows(&bus_rows);
    let students = student_records(&student_rows)?;

    let school_names = students
        .iter()
        .filter_map(|s| SchoolId::new(&s.school).ok());
    let matcher = SchoolMatcher::new(school_names, match_score_cutoff);
    let associations = match_associations(&services, &matcher);
    info!(
        schools = matcher.len(),
        stop_rows = services.len(),
        associations = associations.len(),
        "matched school services"
    );

    let stops = services.into_iter().map(|row| row.stop).collect();
    let dataset = Dataset::assemble(centroids, stops, associations.clone(), students)?;
    Ok(LoadedInputs {
        dataset,
        associations,
    })
}
