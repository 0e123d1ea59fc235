//! The zone–stop walkability graph.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{Coord, DomainError, Stop, StopId, Zone, ZoneCode};
use crate::geo_index::GeoIndex;

use super::error::GraphError;
use super::overlay::GraphSnapshot;
use super::view::AccessView;

/// Walking parameters used to derive edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkParams {
    /// Maximum straight-line walking distance to a stop (meters).
    pub walk_radius_m: f64,
    /// Walking speed (meters per second).
    pub walk_speed_mps: f64,
}

impl WalkParams {
    pub fn new(walk_radius_m: f64, walk_speed_mps: f64) -> Self {
        Self {
            walk_radius_m,
            walk_speed_mps,
        }
    }

    /// Check both values are finite; the radius may be zero, the speed not.
    pub fn validate(&self) -> Result<(), GraphError> {
        if !self.walk_radius_m.is_finite() || self.walk_radius_m < 0.0 {
            return Err(GraphError::InvalidParameter(format!(
                "walk radius must be a non-negative number of meters, got {}",
                self.walk_radius_m
            )));
        }
        if !self.walk_speed_mps.is_finite() || self.walk_speed_mps <= 0.0 {
            return Err(GraphError::InvalidParameter(format!(
                "walk speed must be positive, got {}",
                self.walk_speed_mps
            )));
        }
        Ok(())
    }

    /// Walking time in minutes for a distance, rounded to 0.1 minute.
    pub fn walk_time_min(&self, distance_m: f64) -> f64 {
        let minutes = distance_m / self.walk_speed_mps / 60.0;
        (minutes * 10.0).round() / 10.0
    }
}

/// A walkable link from a zone centroid to a stop within the walk radius.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub stop_id: StopId,
    /// Position of the stop in the owning graph's stop table.
    pub(crate) stop_slot: usize,
    /// Great-circle distance (meters), within the walk radius.
    pub distance_m: f64,
    /// Walking time (minutes, 0.1 precision).
    pub walk_time_min: f64,
    /// The zone's centroid was approximated; treat as low confidence.
    pub approximated: bool,
}

impl Edge {
    /// Order by walking time, then distance, then stop table position.
    pub fn cmp_by_time(a: &Edge, b: &Edge) -> Ordering {
        a.walk_time_min
            .total_cmp(&b.walk_time_min)
            .then(a.distance_m.total_cmp(&b.distance_m))
            .then(a.stop_slot.cmp(&b.stop_slot))
    }
}

/// A zone found within walking distance of a stop.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneNeighbor {
    pub zone: ZoneCode,
    pub distance_m: f64,
    pub walk_time_min: f64,
}

/// Bipartite walkability graph between origin zones and stops.
///
/// Built once from an immutable snapshot of zones and stops. The graph is
/// read-only afterwards; hypothetical stops are evaluated on overlays from
/// [`snapshot`](Self::snapshot). Cloning shares all storage.
#[derive(Debug, Clone)]
pub struct AccessGraph {
    params: WalkParams,
    zones: Arc<[Zone]>,
    zone_lookup: Arc<HashMap<ZoneCode, usize>>,
    stops: Arc<[Stop]>,
    stop_lookup: Arc<HashMap<StopId, usize>>,
    stop_index: GeoIndex,
    /// Absent when there are no zones.
    zone_index: Option<GeoIndex>,
    edges: Arc<[Vec<Edge>]>,
}

impl AccessGraph {
    /// Build the graph, linking every zone to all stops within the walk
    /// radius.
    ///
    /// Fails with [`GraphError::EmptyInput`] when there are no stops and
    /// with [`GraphError::Domain`] on duplicate zone codes or stop ids.
    pub fn build(zones: Vec<Zone>, stops: Vec<Stop>, params: WalkParams) -> Result<Self, GraphError> {
        params.validate()?;

        let mut zone_lookup = HashMap::with_capacity(zones.len());
        for (slot, zone) in zones.iter().enumerate() {
            if zone_lookup.insert(zone.code.clone(), slot).is_some() {
                return Err(DomainError::DuplicateZone(zone.code.clone()).into());
            }
        }

        let mut stop_lookup = HashMap::with_capacity(stops.len());
        for (slot, stop) in stops.iter().enumerate() {
            if stop_lookup.insert(stop.id.clone(), slot).is_some() {
                return Err(DomainError::DuplicateStop(stop.id.clone()).into());
            }
        }

        let stop_coords: Vec<Coord> = stops.iter().map(|s| s.coord).collect();
        let stop_index = GeoIndex::build(&stop_coords)?;

        let zone_coords: Vec<Coord> = zones.iter().map(|z| z.coord).collect();
        let zone_index = GeoIndex::build(&zone_coords).ok();

        let edges: Vec<Vec<Edge>> = zones
            .iter()
            .map(|zone| {
                let mut edges: Vec<Edge> = stop_index
                    .query_radius(&zone.coord, params.walk_radius_m)
                    .into_iter()
                    .map(|n| Edge {
                        stop_id: stops[n.index].id.clone(),
                        stop_slot: n.index,
                        distance_m: n.distance_m,
                        walk_time_min: params.walk_time_min(n.distance_m),
                        approximated: zone.is_approximated(),
                    })
                    .collect();
                edges.sort_by(Edge::cmp_by_time);
                edges
            })
            .collect();

        let edge_count: usize = edges.iter().map(Vec::len).sum();
        let unreachable = edges.iter().filter(|e| e.is_empty()).count();
        info!(
            zones = zones.len(),
            stops = stops.len(),
            edges = edge_count,
            unreachable,
            walk_radius_m = params.walk_radius_m,
            "built access graph"
        );

        Ok(Self {
            params,
            zones: zones.into(),
            zone_lookup: Arc::new(zone_lookup),
            stops: stops.into(),
            stop_lookup: Arc::new(stop_lookup),
            stop_index,
            zone_index,
            edges: edges.into(),
        })
    }

    /// Rebuild over the same zones and stops with new walking parameters.
    pub fn rebuild(&self, params: WalkParams) -> Result<Self, GraphError> {
        debug!(
            from = self.params.walk_radius_m,
            to = params.walk_radius_m,
            "rebuilding access graph"
        );
        Self::build(self.zones.to_vec(), self.stops.to_vec(), params)
    }

    pub fn params(&self) -> WalkParams {
        self.params
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Look up a zone by code.
    pub fn zone(&self, code: &ZoneCode) -> Result<&Zone, GraphError> {
        let slot = self.zone_slot(code)?;
        Ok(&self.zones[slot])
    }

    /// Look up a stop by id.
    pub fn stop(&self, id: &StopId) -> Result<&Stop, GraphError> {
        self.stop_lookup
            .get(id)
            .map(|slot| &self.stops[*slot])
            .ok_or_else(|| GraphError::UnknownStop(id.clone()))
    }

    /// Edges of a zone, sorted ascending by walking time.
    ///
    /// Fails with [`GraphError::UnknownZone`] for a code never loaded.
    pub fn stops_for_zone(&self, code: &ZoneCode) -> Result<&[Edge], GraphError> {
        let slot = self.zone_slot(code)?;
        Ok(&self.edges[slot])
    }

    /// Zones within the walk radius of a stop, nearest first.
    pub fn neighbors_of_stop(&self, id: &StopId) -> Result<Vec<ZoneNeighbor>, GraphError> {
        let stop = self.stop(id)?;
        Ok(self
            .zones_near(&stop.coord)
            .into_iter()
            .map(|(slot, distance_m)| ZoneNeighbor {
                zone: self.zones[slot].code.clone(),
                distance_m,
                walk_time_min: self.params.walk_time_min(distance_m),
            })
            .collect())
    }

    /// Zone slots within the walk radius of a point, with distances.
    pub(crate) fn zones_near(&self, point: &Coord) -> Vec<(usize, f64)> {
        match &self.zone_index {
            Some(index) => index
                .query_radius(point, self.params.walk_radius_m)
                .into_iter()
                .map(|n| (n.index, n.distance_m))
                .collect(),
            None => Vec::new(),
        }
    }

    /// The existing stop closest to a point.
    pub fn nearest_stop(&self, point: &Coord) -> Option<&Stop> {
        self.stop_index
            .query_k_nearest(point, 1)
            .first()
            .map(|n| &self.stops[n.index])
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Start an overlay on which hypothetical stops can be inserted without
    /// touching this graph.
    pub fn snapshot(&self) -> GraphSnapshot<'_> {
        GraphSnapshot::new(self)
    }
}

impl AccessView for AccessGraph {
    fn zones(&self) -> &[Zone] {
        &self.zones
    }

    fn zone_slot(&self, code: &ZoneCode) -> Result<usize, GraphError> {
        self.zone_lookup
            .get(code)
            .copied()
            .ok_or_else(|| GraphError::UnknownZone(code.clone()))
    }

    fn edges_at(&self, slot: usize) -> impl Iterator<Item = &Edge> + '_ {
        self.edges[slot].iter()
    }

    fn stop_at(&self, stop_slot: usize) -> &Stop {
        &self.stops[stop_slot]
    }
}
