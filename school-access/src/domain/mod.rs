//! Domain types for the school access analysis.
//!
//! This module contains the validated records the analysis core works on:
//! zones, stops, schools and their identifiers. All types enforce their
//! invariants at construction time, so code that receives these types can
//! trust their validity.

mod coord;
mod error;
mod ids;
mod stop;
mod zone;

pub use coord::{Coord, EARTH_RADIUS_M, InvalidCoord};
pub(crate) use coord::{arc_to_chord_m, chord_m, chord_to_arc_m};
pub use error::DomainError;
pub use ids::{InvalidId, SchoolId, StopId, ZoneCode};
pub use stop::{School, Stop, StopKind};
pub use zone::{Zone, ZoneDemand, ZoneSource};
