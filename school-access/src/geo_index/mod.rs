//! Spatial nearest-neighbour index over point coordinates.
//!
//! Points are stored as earth-centred cartesian positions in an R-tree.
//! Every distance reported by the index is the great-circle distance derived
//! from the straight-line chord, so radius and k-nearest queries always agree
//! on the metric.

use std::fmt;
use std::sync::Arc;

use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::domain::{Coord, arc_to_chord_m, chord_m, chord_to_arc_m};

/// R-tree entry: cartesian position tagged with its input position.
type IndexedPoint = GeomWithData<[f64; 3], usize>;

/// Initial search radius for k-nearest queries (meters).
const KNN_START_RADIUS_M: f64 = 250.0;

/// Relative slack applied to chord radii so points sitting exactly on the
/// query radius survive floating-point rounding; results are re-filtered on
/// the exact distance.
const CHORD_SLACK: f64 = 1e-9;

/// Errors from building a spatial index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// No points were supplied
    #[error("cannot build a spatial index from zero points")]
    EmptyInput,
}

/// An indexed point found by a proximity query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the point in the slice passed to [`GeoIndex::build`].
    pub index: usize,
    /// Great-circle distance from the query point in meters.
    pub distance_m: f64,
}

/// Immutable proximity index over a fixed set of coordinates.
///
/// Cloning is cheap; the tree is shared.
#[derive(Clone)]
pub struct GeoIndex {
    tree: Arc<RTree<IndexedPoint>>,
    coords: Arc<[Coord]>,
    cartesian: Arc<[[f64; 3]]>,
}

impl GeoIndex {
    /// Build an index over `points`.
    ///
    /// Fails with [`IndexError::EmptyInput`] when `points` is empty.
    pub fn build(points: &[Coord]) -> Result<Self, IndexError> {
        if points.is_empty() {
            return Err(IndexError::EmptyInput);
        }

        let cartesian: Vec<[f64; 3]> = points.iter().map(Coord::to_cartesian).collect();
        let entries: Vec<IndexedPoint> = cartesian
            .iter()
            .enumerate()
            .map(|(i, xyz)| GeomWithData::new(*xyz, i))
            .collect();

        Ok(Self {
            tree: Arc::new(RTree::bulk_load(entries)),
            coords: points.into(),
            cartesian: cartesian.into(),
        })
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Always false; an index cannot be built from zero points.
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Coordinate of the point at `index`, if any.
    pub fn coord(&self, index: usize) -> Option<Coord> {
        self.coords.get(index).copied()
    }

    /// All points within `radius_m` meters of `point`.
    ///
    /// Results are ordered by distance, ties by input position. A negative
    /// or NaN radius matches nothing.
    pub fn query_radius(&self, point: &Coord, radius_m: f64) -> Vec<Neighbor> {
        if radius_m.is_nan() || radius_m < 0.0 {
            return Vec::new();
        }

        let query = point.to_cartesian();
        let mut found: Vec<Neighbor> = self
            .locate_within_arc(query, radius_m)
            .filter(|n| n.distance_m <= radius_m)
            .collect();
        sort_neighbors(&mut found);
        found
    }

    /// The `k` points closest to `point`, nearest first.
    ///
    /// Returns every point when fewer than `k` are indexed. Equal distances
    /// are ordered by input position, so the first-inserted point wins.
    pub fn query_k_nearest(&self, point: &Coord, k: usize) -> Vec<Neighbor> {
        if k == 0 {
            return Vec::new();
        }

        let query = point.to_cartesian();

        if k >= self.len() {
            let mut all: Vec<Neighbor> = (0..self.len())
                .map(|index| Neighbor {
                    index,
                    distance_m: self.distance_to(index, &query),
                })
                .collect();
            sort_neighbors(&mut all);
            return all;
        }

        // Grow the search disc until it holds at least k points. Anything
        // outside the disc is strictly farther than everything inside it.
        let max_arc = std::f64::consts::PI * crate::domain::EARTH_RADIUS_M;
        let mut radius = KNN_START_RADIUS_M;
        let mut found: Vec<Neighbor> = loop {
            let found: Vec<Neighbor> = self.locate_within_arc(query, radius).collect();
            if found.len() >= k || radius >= max_arc {
                break found;
            }
            radius *= 2.0;
        };

        sort_neighbors(&mut found);
        found.truncate(k);
        found
    }

    /// Candidates whose chord distance is within the chord of `radius_m`,
    /// with their exact great-circle distances.
    fn locate_within_arc(
        &self,
        query: [f64; 3],
        radius_m: f64,
    ) -> impl Iterator<Item = Neighbor> + '_ {
        let chord = arc_to_chord_m(radius_m) * (1.0 + CHORD_SLACK) + CHORD_SLACK;
        self.tree
            .locate_within_distance(query, chord * chord)
            .map(move |entry| Neighbor {
                index: entry.data,
                distance_m: self.distance_to(entry.data, &query),
            })
    }

    fn distance_to(&self, index: usize, query: &[f64; 3]) -> f64 {
        chord_to_arc_m(chord_m(&self.cartesian[index], query))
    }
}

impl fmt::Debug for GeoIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoIndex")
            .field("points", &self.coords.len())
            .finish()
    }
}

/// Order by distance, then by input position.
fn sort_neighbors(neighbors: &mut [Neighbor]) {
    neighbors.sort_by(|a, b| {
        a.distance_m
            .total_cmp(&b.distance_m)
            .then(a.index.cmp(&b.index))
    });
}
