//! Zone–stop walkability graph.
//!
//! Links every origin zone to the school-special stops within walking
//! distance of its centroid. The graph is built once per walk radius and is
//! read-only afterwards; the optimizer evaluates hypothetical stops on
//! copy-on-write overlays taken with [`AccessGraph::snapshot`].

mod access;
mod error;
mod fallback;
mod overlay;
mod view;

#[cfg(test)]
pub(crate) mod test_support;

pub use access::{AccessGraph, Edge, WalkParams, ZoneNeighbor};
pub use error::GraphError;
pub use fallback::approximate_zones;
pub use overlay::GraphSnapshot;
pub use view::AccessView;
