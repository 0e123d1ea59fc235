//! Web layer for the school access analysis.
//!
//! Serves the KPI tables of the startup analysis and runs quick-win
//! searches on request.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
