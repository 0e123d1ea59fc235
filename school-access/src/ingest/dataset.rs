//! Assembly of validated records into one immutable input snapshot.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::domain::{DomainError, School, SchoolId, Stop, StopId, Zone, ZoneCode, ZoneDemand};

use super::error::IngestError;
use super::records::{AssociationRecord, StopRecord, StudentDistanceRecord, ZoneRecord};

/// Validated zones, stops and demand for one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Authoritative zone centroids, when a centroid source was supplied.
    /// `None` means zones must be approximated from the stops.
    pub centroids: Option<Vec<Zone>>,
    pub stops: Vec<Stop>,
    pub demand: Vec<ZoneDemand>,
}

impl Dataset {
    /// Validate and combine input records.
    ///
    /// Stops repeated across rows keep their first coordinate. Associations
    /// naming an unknown stop are dropped with a warning. Centroids without
    /// a student count take the sum of their zone's demand records.
    pub fn assemble(
        centroids: Option<Vec<ZoneRecord>>,
        stops: Vec<StopRecord>,
        associations: Vec<AssociationRecord>,
        students: Vec<StudentDistanceRecord>,
    ) -> Result<Self, IngestError> {
        let mut stop_table: Vec<Stop> = Vec::new();
        let mut lookup: HashMap<StopId, usize> = HashMap::new();
        let mut repeated = 0usize;
        for record in stops {
            let stop = record.into_stop()?;
            if lookup.contains_key(&stop.id) {
                repeated += 1;
                continue;
            }
            lookup.insert(stop.id.clone(), stop_table.len());
            stop_table.push(stop);
        }
        if repeated > 0 {
            debug!(rows = repeated, "merged repeated stop rows");
        }

        let mut unknown = 0usize;
        for record in associations {
            let stop_id = StopId::new(&record.stop_id).map_err(DomainError::from)?;
            let school = SchoolId::new(&record.school_id).map_err(DomainError::from)?;
            match lookup.get(&stop_id) {
                Some(slot) => stop_table[*slot].add_school(school, record.match_confidence),
                None => {
                    unknown += 1;
                    warn!(stop = %stop_id, school = %school, "association names an unknown stop");
                }
            }
        }
        if unknown > 0 {
            warn!(associations = unknown, "dropped associations for unknown stops");
        }

        let demand = students
            .into_iter()
            .map(StudentDistanceRecord::into_demand)
            .collect::<Result<Vec<_>, _>>()?;

        let centroids = centroids
            .map(|records| {
                let totals = students_per_zone(&demand);
                records
                    .into_iter()
                    .map(|record| {
                        let mut zone = record.into_zone()?;
                        if zone.student_count.is_none() {
                            zone.student_count = totals.get(&zone.code).copied().flatten();
                        }
                        Ok::<_, DomainError>(zone)
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        info!(
            stops = stop_table.len(),
            demand = demand.len(),
            centroids = centroids.as_ref().map(Vec::len),
            "assembled dataset"
        );

        Ok(Self {
            centroids,
            stops: stop_table,
            demand,
        })
    }

    /// Schools known from stop associations.
    pub fn schools(&self) -> BTreeMap<SchoolId, School> {
        School::index_from_stops(&self.stops)
    }

    /// Number of stops serving at least one school.
    pub fn matched_stops(&self) -> usize {
        self.stops.iter().filter(|s| !s.schools.is_empty()).count()
    }
}

/// Summed student counts per zone; `None` when no record carries a count.
fn students_per_zone(demand: &[ZoneDemand]) -> HashMap<ZoneCode, Option<u32>> {
    let mut totals: HashMap<ZoneCode, Option<u32>> = HashMap::new();
    for record in demand {
        let entry = totals.entry(record.zone.clone()).or_default();
        if let Some(n) = record.students {
            *entry = Some(entry.unwrap_or(0).saturating_add(n));
        }
    }
    totals
}
