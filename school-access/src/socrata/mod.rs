//! Client for the ACT open-data portal (Socrata SODA API).
//!
//! Downloads the school bus services and students-distance datasets as
//! JSON rows for [`crate::ingest`].

mod client;
mod error;

pub use client::{
    DEFAULT_DOMAIN, DEFAULT_ROW_LIMIT, DatasetSpec, KNOWN_DATASETS, SocrataClient,
    SocrataClientConfig, download_all, save_rows,
};
pub use error::SocrataError;
