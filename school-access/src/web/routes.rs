//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::domain::ZoneCode;
use crate::graph::GraphError;
use crate::metrics::{SchoolKpiRow, ZoneKpiRow};
use crate::optimizer::{OptimizeError, QuickWinPlan};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/kpis/summary", get(summary))
        .route("/kpis/zones", get(zones))
        .route("/kpis/zones/:code", get(zone_detail))
        .route("/kpis/schools", get(schools))
        .route("/quick-wins", get(quick_wins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

async fn summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    let config = state.analysis.config();
    Json(SummaryResponse {
        threshold_min: config.threshold_min,
        threshold2_min: config.threshold2_min,
        weighting: config.weighting,
        kpis: state.report.summary.clone(),
    })
}

async fn zones(State(state): State<AppState>) -> Json<Vec<ZoneKpiRow>> {
    Json(state.report.zones.clone())
}

/// KPIs of one zone with its reachable stops.
async fn zone_detail(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ZoneDetailResponse>, AppError> {
    let code = ZoneCode::new(&code).map_err(|e| AppError::BadRequest {
        message: e.to_string(),
    })?;

    let kpis = state
        .report
        .zones
        .iter()
        .find(|row| row.zone_code == code)
        .cloned()
        .ok_or_else(|| AppError::NotFound {
            message: format!("unknown zone: {code}"),
        })?;

    let stops = state
        .analysis
        .graph()
        .stops_for_zone(&code)?
        .iter()
        .map(ReachableStop::from)
        .collect();

    let schools = state
        .report
        .zone_schools
        .iter()
        .filter(|row| row.zone_code == code)
        .cloned()
        .collect();

    Ok(Json(ZoneDetailResponse {
        kpis,
        stops,
        schools,
    }))
}

async fn schools(State(state): State<AppState>) -> Json<Vec<SchoolKpiRow>> {
    Json(state.report.schools.clone())
}

/// Run (or fetch from cache) a quick-win search.
///
/// The search is CPU-bound and runs on the blocking pool.
async fn quick_wins(
    State(state): State<AppState>,
    Query(query): Query<QuickWinQuery>,
) -> Result<Json<QuickWinPlan>, AppError> {
    let search = query.apply(state.analysis.config().quick_win_config());

    let analysis = state.analysis.clone();
    let plan = state
        .plans
        .get_or_compute(&search, || async move {
            tokio::task::spawn_blocking(move || analysis.quick_wins(search))
                .await
                .map_err(|e| AppError::Internal {
                    message: format!("quick-win search failed: {e}"),
                })?
                .map_err(AppError::from)
        })
        .await?;

    Ok(Json(QuickWinPlan::clone(&plan)))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Internal { message: String },
}

impl From<GraphError> for AppError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::UnknownZone(_) | GraphError::UnknownStop(_) => AppError::NotFound {
                message: e.to_string(),
            },
            GraphError::InvalidParameter(_) => AppError::BadRequest {
                message: e.to_string(),
            },
            _ => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl From<OptimizeError> for AppError {
    fn from(e: OptimizeError) -> Self {
        match e {
            OptimizeError::InvalidBudget(_) => AppError::BadRequest {
                message: e.to_string(),
            },
            OptimizeError::Graph(graph) => graph.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
