use super::common::{map_service_error, success_response};
use crate::{
    errors::{ApiError, ErrorResponse},
    handlers::AppState,
    services::costing::{CostReport, CostTrendPoint},
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

/// Creates the router for cost analysis endpoints
pub fn cost_analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/:bom_id/cost-analysis", get(cost_analysis))
        .route("/:bom_id/cost-trend", get(cost_trend))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct WindowParams {
    /// Trailing window in months; one of 3, 6 or 12
    #[serde(default = "default_window_months")]
    pub window_months: u32,
}

fn default_window_months() -> u32 {
    12
}

/// Cost breakdown of a BOM over a trailing window
#[utoipa::path(
    get,
    path = "/api/v1/boms/{bom_id}/cost-analysis",
    params(
        ("bom_id" = i64, Path, description = "BOM identifier"),
        WindowParams
    ),
    responses(
        (status = 200, description = "Hierarchical cost breakdown", body = CostReport),
        (status = 400, description = "Window is not 3, 6 or 12 months", body = ErrorResponse),
        (status = 404, description = "Unknown BOM, or no price data at all in the window", body = ErrorResponse),
        (status = 422, description = "The BOM contains itself", body = ErrorResponse)
    ),
    tag = "cost-analysis"
)]
pub async fn cost_analysis(
    State(state): State<AppState>,
    Path(bom_id): Path<i64>,
    Query(params): Query<WindowParams>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .services
        .costing
        .analyze(bom_id, params.window_months)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(&*report))
}

/// Per-month total cost over the window
#[utoipa::path(
    get,
    path = "/api/v1/boms/{bom_id}/cost-trend",
    params(
        ("bom_id" = i64, Path, description = "BOM identifier"),
        WindowParams
    ),
    responses(
        (status = 200, description = "One total per month, oldest first", body = [CostTrendPoint]),
        (status = 400, description = "Window is not 3, 6 or 12 months", body = ErrorResponse),
        (status = 404, description = "Unknown BOM, or no price data at all in the window", body = ErrorResponse)
    ),
    tag = "cost-analysis"
)]
pub async fn cost_trend(
    State(state): State<AppState>,
    Path(bom_id): Path<i64>,
    Query(params): Query<WindowParams>,
) -> Result<impl IntoResponse, ApiError> {
    let points = state
        .services
        .costing
        .cost_trend(bom_id, params.window_months)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(points))
}
