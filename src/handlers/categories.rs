use super::common::{map_service_error, success_response};
use crate::{
    entities::product_category,
    errors::{ApiError, ErrorResponse},
    handlers::AppState,
    services::catalog::{CategoryFilter, CategoryResolution},
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Creates the router for category drill-down endpoints
pub fn category_routes() -> Router<AppState> {
    Router::new().route("/", get(resolve_categories))
}

/// Selected category id per hierarchy level; all optional
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CategoryFilterParams {
    pub level1: Option<i64>,
    pub level2: Option<i64>,
    pub level3: Option<i64>,
    pub level4: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryDto {
    pub id: i64,
    pub name: String,
    pub level: i16,
    pub parent_id: Option<i64>,
}

impl From<product_category::Model> for CategoryDto {
    fn from(model: product_category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            level: model.level,
            parent_id: model.parent_id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResolutionResponse {
    /// The validated selection chain, deepest last
    pub selected: Vec<CategoryDto>,
    /// Valid choices one level below the deepest selection
    pub next_choices: Vec<CategoryDto>,
}

impl From<CategoryResolution> for CategoryResolutionResponse {
    fn from(resolution: CategoryResolution) -> Self {
        Self {
            selected: resolution.selected.into_iter().map(Into::into).collect(),
            next_choices: resolution
                .next_choices
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

/// Resolve a category drill-down selection
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(CategoryFilterParams),
    responses(
        (status = 200, description = "Resolved selection and next-level choices", body = CategoryResolutionResponse),
        (status = 400, description = "Inconsistent category selection", body = ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn resolve_categories(
    State(state): State<AppState>,
    Query(params): Query<CategoryFilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = CategoryFilter {
        level1: params.level1,
        level2: params.level2,
        level3: params.level3,
        level4: params.level4,
    };
    let resolution = state
        .services
        .catalog
        .resolve_categories(filter)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(CategoryResolutionResponse::from(
        resolution,
    )))
}
