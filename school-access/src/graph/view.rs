//! Read access shared by the base graph and its snapshots.

use crate::domain::{Stop, Zone, ZoneCode};

use super::{Edge, GraphError};

/// Read-only view of a zone–stop walkability relation.
///
/// Implemented by [`AccessGraph`](super::AccessGraph) and by the overlays
/// returned from [`AccessGraph::snapshot`](super::AccessGraph::snapshot), so
/// metrics can be computed identically on both.
pub trait AccessView: Sync {
    /// All zones, in slot order.
    fn zones(&self) -> &[Zone];

    /// Slot of a zone in [`zones`](Self::zones).
    fn zone_slot(&self, code: &ZoneCode) -> Result<usize, GraphError>;

    /// Edges of the zone at `slot`. Order is unspecified.
    fn edges_at(&self, slot: usize) -> impl Iterator<Item = &Edge> + '_;

    /// The stop an edge points at.
    fn stop_at(&self, stop_slot: usize) -> &Stop;

    /// Edges of a zone sorted ascending by walking time.
    fn sorted_edges(&self, code: &ZoneCode) -> Result<Vec<Edge>, GraphError> {
        let slot = self.zone_slot(code)?;
        let mut edges: Vec<Edge> = self.edges_at(slot).cloned().collect();
        edges.sort_by(Edge::cmp_by_time);
        Ok(edges)
    }
}
