//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::PlanCache;
use crate::pipeline::{Analysis, AnalysisReport};

/// Shared application state.
///
/// The analysis is built once at startup and is read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Access graph, demand and default parameters
    pub analysis: Arc<Analysis>,

    /// Report tables for the default parameters
    pub report: Arc<AnalysisReport>,

    /// Quick-win plans computed on request
    pub plans: Arc<PlanCache>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(analysis: Analysis, report: AnalysisReport, plans: PlanCache) -> Self {
        Self {
            analysis: Arc::new(analysis),
            report: Arc::new(report),
            plans: Arc::new(plans),
        }
    }
}
