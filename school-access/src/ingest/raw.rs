//! Column resolution for raw open-data rows.
//!
//! Portal exports name the same field differently across datasets and
//! revisions, so each field is looked up from a list of accepted column
//! names, case-insensitively, first match wins.

use std::collections::HashSet;

use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, warn};

use crate::matching::{HEADSIGN_COLUMNS, SchoolMatcher};

use super::error::IngestError;
use super::records::{AssociationRecord, StopRecord, StudentDistanceRecord};

/// One row of a JSON dataset export.
pub type RawRow = serde_json::Map<String, Value>;

pub const STOP_ID_COLUMNS: &[&str] = &["stop_id", "stop_code", "stopid", "stopcode"];
pub const LAT_COLUMNS: &[&str] = &["stop_lat", "lat", "latitude"];
pub const LON_COLUMNS: &[&str] = &["stop_lon", "lon", "longitude"];
pub const POINT_COLUMNS: &[&str] = &["location", "point", "the_geom", "geom"];
pub const ZONE_COLUMNS: &[&str] = &["sa1_code_2021", "sa1_code", "sa1", "sa1id", "sa1_code_2016"];
pub const SCHOOL_COLUMNS: &[&str] = &["school", "school_name", "schoolname", "school_label"];
pub const STUDENT_COLUMNS: &[&str] = &["students", "student_count", "count", "number_of_students"];

/// A stop row from the school bus services dataset and its route text.
#[derive(Debug, Clone, PartialEq)]
pub struct BusServiceRow {
    pub stop: StopRecord,
    /// Headsign and route columns joined by spaces.
    pub text: String,
}

/// First present column among `candidates`.
fn field<'r>(row: &'r RawRow, candidates: &[&str]) -> Option<&'r Value> {
    candidates.iter().find_map(|name| {
        row.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

fn has_column(rows: &[RawRow], candidates: &[&str]) -> bool {
    rows.iter().any(|row| field(row, candidates).is_some())
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse a WKT point, `POINT (lon lat)`, into `(lat, lon)`.
pub fn parse_wkt_point(s: &str) -> Option<(f64, f64)> {
    let rest = s.trim().strip_prefix("POINT")?.trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    let mut parts = inner.split_whitespace();
    let lon: f64 = parts.next()?.parse().ok()?;
    let lat: f64 = parts.next()?.parse().ok()?;
    Some((lat, lon))
}

/// A point value: WKT text, a GeoJSON point or a portal location object.
fn point(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::String(s) => parse_wkt_point(s),
        Value::Object(obj) => {
            if let Some(Value::Array(coords)) = obj.get("coordinates") {
                let lon = number(coords.first()?)?;
                let lat = number(coords.get(1)?)?;
                return Some((lat, lon));
            }
            Some((number(obj.get("latitude")?)?, number(obj.get("longitude")?)?))
        }
        _ => None,
    }
}

/// Row coordinate as `(lat, lon)`.
///
/// Explicit latitude/longitude columns win; then the usual point columns;
/// then any column holding WKT point text.
pub fn row_coord(row: &RawRow) -> Option<(f64, f64)> {
    let lat = field(row, LAT_COLUMNS).and_then(number);
    let lon = field(row, LON_COLUMNS).and_then(number);
    if let (Some(lat), Some(lon)) = (lat, lon) {
        return Some((lat, lon));
    }

    field(row, POINT_COLUMNS).and_then(point).or_else(|| {
        row.values().find_map(|v| match v {
            Value::String(s) if s.trim_start().starts_with("POINT") => parse_wkt_point(s),
            _ => None,
        })
    })
}

/// Route text of a row: every present headsign column, joined.
pub fn headsign_text(row: &RawRow) -> String {
    HEADSIGN_COLUMNS
        .iter()
        .filter_map(|name| field(row, &[*name]).and_then(text))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stop rows of the school bus services dataset.
///
/// A dataset without any stop id column uses row indices as ids. When the
/// column exists, rows missing an id are skipped, as are rows without a
/// usable coordinate.
pub fn bus_service_rows(rows: &[RawRow]) -> Vec<BusServiceRow> {
    let index_ids = !has_column(rows, STOP_ID_COLUMNS);
    if index_ids && !rows.is_empty() {
        warn!("bus services have no stop id column; using row indices");
    }

    let mut no_coord = 0usize;
    let mut no_id = 0usize;
    let out: Vec<BusServiceRow> = rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let Some((lat, lon)) = row_coord(row) else {
                no_coord += 1;
                return None;
            };
            let id = if index_ids {
                index.to_string()
            } else {
                let Some(id) = field(row, STOP_ID_COLUMNS).and_then(text) else {
                    no_id += 1;
                    return None;
                };
                id
            };
            Some(BusServiceRow {
                stop: StopRecord { id, lat, lon },
                text: headsign_text(row),
            })
        })
        .collect();

    if no_coord > 0 {
        warn!(rows = no_coord, "skipped bus service rows without coordinates");
    }
    if no_id > 0 {
        warn!(rows = no_id, "skipped bus service rows without a stop id");
    }
    debug!(rows = out.len(), "resolved bus service rows");
    out
}

/// Student-distance rows.
///
/// Fails when no row has a zone or school column; individual rows missing
/// either value are skipped.
pub fn student_records(rows: &[RawRow]) -> Result<Vec<StudentDistanceRecord>, IngestError> {
    const DATASET: &str = "students distance";
    if !rows.is_empty() {
        if !has_column(rows, ZONE_COLUMNS) {
            return Err(IngestError::MissingColumn {
                dataset: DATASET,
                candidates: ZONE_COLUMNS,
            });
        }
        if !has_column(rows, SCHOOL_COLUMNS) {
            return Err(IngestError::MissingColumn {
                dataset: DATASET,
                candidates: SCHOOL_COLUMNS,
            });
        }
    }

    let records: Vec<StudentDistanceRecord> = rows
        .iter()
        .filter_map(|row| {
            let zone_code = field(row, ZONE_COLUMNS).and_then(text)?;
            let school = field(row, SCHOOL_COLUMNS).and_then(text)?;
            let students = field(row, STUDENT_COLUMNS)
                .and_then(number)
                .filter(|n| n.is_finite() && *n >= 0.0)
                .map(|n| n.round() as u32);
            Some(StudentDistanceRecord {
                zone_code,
                school,
                students,
            })
        })
        .collect();

    if records.len() < rows.len() {
        debug!(
            skipped = rows.len() - records.len(),
            "skipped student rows without zone or school"
        );
    }
    Ok(records)
}

/// Match every bus service row's text to a school.
///
/// Matching runs in parallel; the output keeps row order and holds each
/// (stop, school) pair once.
pub fn match_associations(rows: &[BusServiceRow], matcher: &SchoolMatcher) -> Vec<AssociationRecord> {
    let matched: Vec<AssociationRecord> = rows
        .par_iter()
        .filter_map(|row| {
            matcher.match_text(&row.text).map(|m| AssociationRecord {
                stop_id: row.stop.id.clone(),
                school_id: m.school.as_str().to_string(),
                match_confidence: m.confidence,
            })
        })
        .collect();

    let mut seen = HashSet::new();
    let unique: Vec<AssociationRecord> = matched
        .into_iter()
        .filter(|a| seen.insert((a.stop_id.clone(), a.school_id.clone())))
        .collect();
    debug!(
        rows = rows.len(),
        associations = unique.len(),
        "matched headsigns to schools"
    );
    unique
}
