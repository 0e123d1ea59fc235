//! Typed input records handed from ingestion to the graph core.

use serde::{Deserialize, Serialize};

use crate::domain::{Coord, DomainError, SchoolId, Stop, StopId, Zone, ZoneCode, ZoneDemand, ZoneSource};

/// An origin zone with its centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub code: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub student_count: Option<u32>,
    #[serde(default)]
    pub source: ZoneSource,
}

impl ZoneRecord {
    pub fn into_zone(self) -> Result<Zone, DomainError> {
        Ok(Zone {
            code: ZoneCode::new(&self.code)?,
            coord: Coord::new(self.lat, self.lon)?,
            student_count: self.student_count,
            source: self.source,
        })
    }
}

/// A school-special stop location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
}

impl StopRecord {
    pub fn into_stop(self) -> Result<Stop, DomainError> {
        Ok(Stop::new(StopId::new(&self.id)?, Coord::new(self.lat, self.lon)?))
    }
}

/// A stop serving a school, with the headsign match score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRecord {
    pub stop_id: String,
    pub school_id: String,
    pub match_confidence: f64,
}

/// One row of the students-distance table: students from a zone attending a
/// school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDistanceRecord {
    pub zone_code: String,
    pub school: String,
    #[serde(default)]
    pub students: Option<u32>,
}

impl StudentDistanceRecord {
    pub fn into_demand(self) -> Result<ZoneDemand, DomainError> {
        Ok(ZoneDemand {
            zone: ZoneCode::new(&self.zone_code)?,
            school: SchoolId::new(&self.school)?,
            students: self.students,
        })
    }
}
