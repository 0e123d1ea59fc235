//! Client for the ABS boundary service's SA1 centroid layer.
//!
//! Pages through the ArcGIS query endpoint and writes the centroids to
//! `manual/sa1_centroids.csv` for [`crate::ingest`]. Without that file the
//! analysis falls back to approximated zones.

mod client;
mod error;

pub use client::{
    ACT_STATE_CODE, CentroidClient, CentroidClientConfig, CentroidPage, CentroidPoint,
    DEFAULT_PAGE_SIZE, DEFAULT_QUERY_URL, centroids_csv, download_centroids, parse_page,
    save_centroids,
};
pub use error::CentroidError;
