//! School access analysis.
//!
//! Measures how far students live from the school-special bus stops that
//! serve them, and proposes a few new stops that would close the largest
//! coverage gaps.

pub mod cache;
pub mod centroids;
pub mod config;
pub mod domain;
pub mod export;
pub mod geo_index;
pub mod graph;
pub mod ingest;
pub mod matching;
pub mod metrics;
pub mod optimizer;
pub mod pipeline;
pub mod socrata;
pub mod web;
