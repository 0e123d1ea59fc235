//! Copy-on-write overlays for hypothetical stop insertions.

use std::collections::BTreeMap;

use crate::domain::{Stop, Zone, ZoneCode};

use super::access::{AccessGraph, Edge};
use super::error::GraphError;
use super::view::AccessView;

/// An [`AccessGraph`] plus a handful of inserted stops.
///
/// The base graph is borrowed and never modified. Only the inserted stops
/// and their new edges are owned, so cloning an overlay to try one more
/// stop is cheap.
#[derive(Debug, Clone)]
pub struct GraphSnapshot<'g> {
    base: &'g AccessGraph,
    added: Vec<Stop>,
    /// Extra edges per zone slot, produced by the inserted stops.
    extra_edges: BTreeMap<usize, Vec<Edge>>,
}

impl<'g> GraphSnapshot<'g> {
    pub(crate) fn new(base: &'g AccessGraph) -> Self {
        Self {
            base,
            added: Vec::new(),
            extra_edges: BTreeMap::new(),
        }
    }

    /// The graph this overlay sits on.
    pub fn base(&self) -> &'g AccessGraph {
        self.base
    }

    /// Stops inserted so far, in insertion order.
    pub fn added_stops(&self) -> &[Stop] {
        &self.added
    }

    /// A copy of this overlay with one more stop.
    pub fn with_stop(&self, stop: Stop) -> Self {
        let mut next = self.clone();
        next.insert_stop(stop);
        next
    }

    /// Insert a stop, linking it to every zone within the walk radius.
    ///
    /// The caller is responsible for giving candidate stops ids that do not
    /// collide with real ones.
    pub fn insert_stop(&mut self, stop: Stop) {
        let params = self.base.params();
        let stop_slot = self.base.stops().len() + self.added.len();
        let zones = self.base.zones();

        for (zone_slot, distance_m) in self.base.zones_near(&stop.coord) {
            self.extra_edges.entry(zone_slot).or_default().push(Edge {
                stop_id: stop.id.clone(),
                stop_slot,
                distance_m,
                walk_time_min: params.walk_time_min(distance_m),
                approximated: zones[zone_slot].is_approximated(),
            });
        }

        self.added.push(stop);
    }

    /// Edges of a zone including inserted stops, sorted by walking time.
    pub fn stops_for_zone(&self, code: &ZoneCode) -> Result<Vec<Edge>, GraphError> {
        self.sorted_edges(code)
    }
}

impl AccessView for GraphSnapshot<'_> {
    fn zones(&self) -> &[Zone] {
        self.base.zones()
    }

    fn zone_slot(&self, code: &ZoneCode) -> Result<usize, GraphError> {
        self.base.zone_slot(code)
    }

    fn edges_at(&self, slot: usize) -> impl Iterator<Item = &Edge> + '_ {
        self.base
            .edges_at(slot)
            .chain(self.extra_edges.get(&slot).into_iter().flatten())
    }

    fn stop_at(&self, stop_slot: usize) -> &Stop {
        let base_len = self.base.stops().len();
        if stop_slot < base_len {
            self.base.stop_at(stop_slot)
        } else {
            &self.added[stop_slot - base_len]
        }
    }
}
