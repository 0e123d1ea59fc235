//! Fixtures shared by graph, metrics and optimizer tests.
//!
//! Points are laid out along the meridian through a fixed origin so that
//! distances in meters can be read straight off the fixture.

use std::collections::BTreeMap;

use crate::domain::{Coord, EARTH_RADIUS_M, SchoolId, Stop, StopId, Zone, ZoneCode};

use super::WalkParams;

const ORIGIN_LAT: f64 = -35.30;
const ORIGIN_LON: f64 = 149.10;

/// Coordinate `north_m` meters north of the origin.
pub fn point_north(north_m: f64) -> Coord {
    let degrees = (north_m / EARTH_RADIUS_M).to_degrees();
    Coord::new(ORIGIN_LAT + degrees, ORIGIN_LON).unwrap()
}

/// 900 m radius at 1.25 m/s: 900 m is 12.0 minutes.
pub fn params() -> WalkParams {
    WalkParams::new(900.0, 1.25)
}

pub fn code(s: &str) -> ZoneCode {
    ZoneCode::new(s).unwrap()
}

pub fn stop_id(s: &str) -> StopId {
    StopId::new(s).unwrap()
}

pub fn school(s: &str) -> SchoolId {
    SchoolId::new(s).unwrap()
}

pub fn zone_at(code_str: &str, north_m: f64) -> Zone {
    Zone::new(code(code_str), point_north(north_m))
}

pub fn stop_at(id: &str, north_m: f64) -> Stop {
    Stop::new(stop_id(id), point_north(north_m))
}

pub fn school_stop_at(id: &str, north_m: f64, schools: &[&str]) -> Stop {
    let mut stop = stop_at(id, north_m);
    for s in schools {
        stop.add_school(school(s), 90.0);
    }
    stop
}

pub fn candidate_at(id: &str, north_m: f64) -> Stop {
    Stop::candidate(stop_id(id), point_north(north_m), BTreeMap::new())
}

/// Meters covered in `minutes` at the fixture walking speed.
pub fn meters_for_minutes(minutes: f64) -> f64 {
    minutes * 60.0 * params().walk_speed_mps
}
