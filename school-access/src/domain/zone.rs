//! Origin zones.

use serde::{Deserialize, Serialize};

use super::{Coord, SchoolId, ZoneCode};

/// Where a zone's coordinate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneSource {
    /// Centroid supplied by an authoritative boundary dataset.
    #[default]
    Authoritative,
    /// Centroid snapped onto a known stop because no boundary data exists.
    /// Distance-0 edges from such zones are low confidence.
    Approximated,
}

/// A residential origin area represented by its centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub code: ZoneCode,
    pub coord: Coord,
    /// Students living in the zone, when known. Used for weighting.
    pub student_count: Option<u32>,
    pub source: ZoneSource,
}

impl Zone {
    /// Create a zone with an authoritative centroid.
    pub fn new(code: ZoneCode, coord: Coord) -> Self {
        Self {
            code,
            coord,
            student_count: None,
            source: ZoneSource::Authoritative,
        }
    }

    /// Set the student count.
    pub fn with_students(mut self, count: u32) -> Self {
        self.student_count = Some(count);
        self
    }

    /// Mark the zone's centroid as approximated.
    pub fn approximated(mut self) -> Self {
        self.source = ZoneSource::Approximated;
        self
    }

    /// Returns true if the centroid was approximated from a stop.
    pub fn is_approximated(&self) -> bool {
        self.source == ZoneSource::Approximated
    }
}

/// Students from a zone attending a school, from the student-distance
/// records. Drives the fallback centroid policy and the per-school KPIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneDemand {
    pub zone: ZoneCode,
    pub school: SchoolId,
    pub students: Option<u32>,
}
