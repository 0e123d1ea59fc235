//! Accessibility indicators derived from the access graph.
//!
//! All indicators are pure functions of a graph's edge set; nothing is
//! cached between calls.

mod access;
mod kpi;
mod weighting;

pub use access::AccessMetrics;
pub use kpi::{AggregateKpis, SchoolKpiRow, ZoneKpiRow, ZonePairKpiRow, ZoneSchoolRow};
pub use weighting::{InvalidWeighting, Weighting};
