//! Geographic coordinates.

use std::fmt;

use serde::Serialize;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Error returned when a latitude/longitude pair is not a valid position.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid coordinate ({lat}, {lon}): {reason}")]
pub struct InvalidCoord {
    lat: f64,
    lon: f64,
    reason: &'static str,
}

/// A WGS84 position in decimal degrees.
///
/// Latitude is within [-90, 90] and longitude within [-180, 180]; both are
/// finite. Any `Coord` value is valid by construction.
///
/// # Examples
///
/// ```
/// use school_access::domain::Coord;
///
/// let civic = Coord::new(-35.2809, 149.1300).unwrap();
/// assert_eq!(civic.lat(), -35.2809);
///
/// assert!(Coord::new(91.0, 0.0).is_err());
/// assert!(Coord::new(0.0, f64::NAN).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Serialize)]
pub struct Coord {
    lat: f64,
    lon: f64,
}

impl Coord {
    /// Create a coordinate from latitude and longitude in degrees.
    pub fn new(lat: f64, lon: f64) -> Result<Self, InvalidCoord> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(InvalidCoord {
                lat,
                lon,
                reason: "must be finite",
            });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(InvalidCoord {
                lat,
                lon,
                reason: "latitude out of range",
            });
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(InvalidCoord {
                lat,
                lon,
                reason: "longitude out of range",
            });
        }
        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Earth-centred cartesian position on a sphere of `EARTH_RADIUS_M`.
    ///
    /// Chord length between two such points is monotone in great-circle
    /// distance, which is what the spatial index relies on.
    pub fn to_cartesian(&self) -> [f64; 3] {
        let lat = self.lat.to_radians();
        let lon = self.lon.to_radians();
        [
            EARTH_RADIUS_M * lat.cos() * lon.cos(),
            EARTH_RADIUS_M * lat.cos() * lon.sin(),
            EARTH_RADIUS_M * lat.sin(),
        ]
    }

    /// Great-circle distance in meters.
    pub fn distance_m(&self, other: &Coord) -> f64 {
        chord_to_arc_m(chord_m(&self.to_cartesian(), &other.to_cartesian()))
    }

    /// Move from `self` toward `target` by at most `max_offset_m` meters.
    ///
    /// Interpolates linearly in degrees, which is accurate enough for the
    /// few hundred meters a route detour spans. Returns `target` when it is
    /// already within reach.
    pub fn toward(&self, target: &Coord, max_offset_m: f64) -> Coord {
        let dist = self.distance_m(target);
        if dist <= max_offset_m || dist == 0.0 {
            return *target;
        }
        let frac = (max_offset_m.max(0.0) / dist).clamp(0.0, 1.0);
        Coord {
            lat: self.lat + (target.lat - self.lat) * frac,
            lon: self.lon + (target.lon - self.lon) * frac,
        }
    }
}

/// Straight-line (chord) distance between two cartesian points.
pub(crate) fn chord_m(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Convert a chord length to the great-circle arc it subtends.
pub(crate) fn chord_to_arc_m(chord: f64) -> f64 {
    let half = (chord / (2.0 * EARTH_RADIUS_M)).clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_M * half.asin()
}

/// Convert a great-circle arc length to the chord it subtends.
pub(crate) fn arc_to_chord_m(arc: f64) -> f64 {
    let angle = (arc / (2.0 * EARTH_RADIUS_M)).clamp(0.0, std::f64::consts::FRAC_PI_2);
    2.0 * EARTH_RADIUS_M * angle.sin()
}

impl fmt::Debug for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coord({}, {})", self.lat, self.lon)
    }
}
