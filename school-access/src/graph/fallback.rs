//! Approximate zone centroids when no boundary data is available.
//!
//! Each zone is placed on a stop serving one of the schools its students
//! attend, falling back to any stop when none of those schools is matched.
//! The choice among eligible stops is a stable hash of the zone code, so
//! reruns place every zone identically. Zones produced here are flagged
//! `approximated`; their distance-0 edges must be read as low confidence.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::domain::{SchoolId, Stop, Zone, ZoneCode, ZoneDemand};

use super::error::GraphError;

/// Build approximated zones from student-distance demand records.
///
/// Zones are returned ordered by code. Student counts are summed per zone;
/// a zone whose records carry no counts has no student count.
///
/// Fails with [`GraphError::EmptyInput`] when there are no stops to snap to.
pub fn approximate_zones(demand: &[ZoneDemand], stops: &[Stop]) -> Result<Vec<Zone>, GraphError> {
    if stops.is_empty() {
        return Err(GraphError::EmptyInput);
    }

    let mut per_zone: BTreeMap<&ZoneCode, (BTreeSet<&SchoolId>, Option<u32>)> = BTreeMap::new();
    for record in demand {
        let entry = per_zone.entry(&record.zone).or_default();
        entry.0.insert(&record.school);
        if let Some(n) = record.students {
            entry.1 = Some(entry.1.unwrap_or(0).saturating_add(n));
        }
    }

    let mut unmatched = 0usize;
    let zones: Vec<Zone> = per_zone
        .into_iter()
        .map(|(code, (schools, students))| {
            let serving: Vec<&Stop> = stops
                .iter()
                .filter(|s| schools.iter().any(|school| s.serves(school)))
                .collect();

            let stop = if serving.is_empty() {
                unmatched += 1;
                &stops[pick(code, stops.len())]
            } else {
                serving[pick(code, serving.len())]
            };

            debug!(zone = %code, stop = %stop.id, "approximated zone centroid");
            let mut zone = Zone::new(code.clone(), stop.coord).approximated();
            zone.student_count = students;
            zone
        })
        .collect();

    if unmatched > 0 {
        warn!(
            zones = unmatched,
            "zones with no matched school stop were snapped to an arbitrary stop"
        );
    }

    Ok(zones)
}

/// Deterministic index in `0..len` derived from the zone code (FNV-1a).
fn pick(code: &ZoneCode, len: usize) -> usize {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = code
        .as_str()
        .bytes()
        .fold(OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(PRIME));
    (hash % len as u64) as usize
}
