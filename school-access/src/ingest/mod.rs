//! Input records and their ingestion from open-data downloads.
//!
//! Raw rows are resolved into typed records ([`records`]), stop route text
//! is matched to schools, and everything is validated into a [`Dataset`].

mod dataset;
mod error;
mod loader;
pub mod raw;
mod records;

pub use dataset::Dataset;
pub use error::IngestError;
pub use loader::{
    BUS_SERVICES_FILE, CENTROIDS_FILE, LoadedInputs, STUDENTS_FILE, load_inputs,
    read_centroids_csv, read_json_rows,
};
pub use records::{AssociationRecord, StopRecord, StudentDistanceRecord, ZoneRecord};
