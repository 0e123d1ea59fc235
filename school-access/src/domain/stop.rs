//! School-special stops and the schools they serve.

use std::collections::{BTreeMap, BTreeSet};

use super::{Coord, SchoolId, StopId};

/// Whether a stop exists in the network or was proposed by the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopKind {
    /// Loaded from the stop dataset.
    Real,
    /// Synthetic stop evaluated by the quick-win search. Never persisted
    /// back into the authoritative stop set.
    Candidate,
}

/// A physical stop location served by school-special routes.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub id: StopId,
    pub coord: Coord,
    pub kind: StopKind,
    /// School associations with their match confidence. Only presence
    /// matters to the access metrics.
    pub schools: BTreeMap<SchoolId, f64>,
}

impl Stop {
    /// Create a real stop with no school associations.
    pub fn new(id: StopId, coord: Coord) -> Self {
        Self {
            id,
            coord,
            kind: StopKind::Real,
            schools: BTreeMap::new(),
        }
    }

    /// Create a candidate stop.
    pub fn candidate(id: StopId, coord: Coord, schools: BTreeMap<SchoolId, f64>) -> Self {
        Self {
            id,
            coord,
            kind: StopKind::Candidate,
            schools,
        }
    }

    /// Record that this stop serves a school.
    ///
    /// Keeps the higher confidence when the pair is already known.
    pub fn add_school(&mut self, school: SchoolId, confidence: f64) {
        let entry = self.schools.entry(school).or_insert(confidence);
        if confidence > *entry {
            *entry = confidence;
        }
    }

    /// Returns true if the stop serves the given school.
    pub fn serves(&self, school: &SchoolId) -> bool {
        self.schools.contains_key(school)
    }

    pub fn is_candidate(&self) -> bool {
        self.kind == StopKind::Candidate
    }
}

/// A school and the stops serving it.
#[derive(Debug, Clone, PartialEq)]
pub struct School {
    pub id: SchoolId,
    pub name: String,
    pub stops: BTreeSet<StopId>,
}

impl School {
    /// Derive the school directory from stop associations.
    ///
    /// Schools are keyed by id; the name is the id as the upstream datasets
    /// identify schools by name.
    pub fn index_from_stops(stops: &[Stop]) -> BTreeMap<SchoolId, School> {
        let mut schools: BTreeMap<SchoolId, School> = BTreeMap::new();
        for stop in stops {
            for school in stop.schools.keys() {
                schools
                    .entry(school.clone())
                    .or_insert_with(|| School {
                        id: school.clone(),
                        name: school.as_str().to_string(),
                        stops: BTreeSet::new(),
                    })
                    .stops
                    .insert(stop.id.clone());
            }
        }
        schools
    }
}
