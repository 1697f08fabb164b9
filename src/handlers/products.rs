use super::common::{map_service_error, success_response};
use crate::{
    entities::{bom_header, product},
    errors::{ApiError, ErrorResponse},
    handlers::AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Creates the router for product and BOM lookup endpoints
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/:code/boms", get(list_boms))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListProductsParams {
    /// Category to list products for; levels above 4 are expanded to their
    /// level-4 leaves
    pub category_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDto {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub uom: Option<String>,
    pub category_id: i64,
}

impl From<product::Model> for ProductDto {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            uom: model.uom,
            category_id: model.category_id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BomDto {
    pub bom_id: i64,
    pub code: Option<String>,
    #[schema(value_type = String)]
    pub output_qty: Decimal,
    pub effective_from: NaiveDate,
}

impl From<bom_header::Model> for BomDto {
    fn from(model: bom_header::Model) -> Self {
        Self {
            bom_id: model.bom_id,
            code: model.code,
            output_qty: model.output_qty,
            effective_from: model.effective_from,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BomListResponse {
    pub product: ProductDto,
    /// Available BOM versions, newest effective first
    pub boms: Vec<BomDto>,
}

/// List the products of a category
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ListProductsParams),
    responses(
        (status = 200, description = "Products ordered by name, then code", body = [ProductDto]),
        (status = 404, description = "Unknown category or no products", body = ErrorResponse)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListProductsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .catalog
        .list_products(params.category_id)
        .await
        .map_err(map_service_error)?;
    let dtos: Vec<ProductDto> = products.into_iter().map(Into::into).collect();
    Ok(success_response(dtos))
}

/// List the BOM versions of a product
#[utoipa::path(
    get,
    path = "/api/v1/products/{code}/boms",
    params(("code" = String, Path, description = "Product code")),
    responses(
        (status = 200, description = "Product and its BOM versions", body = BomListResponse),
        (status = 404, description = "Unknown product or no BOMs", body = ErrorResponse)
    ),
    tag = "products"
)]
pub async fn list_boms(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (product, boms) = state
        .services
        .catalog
        .list_boms(&code)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(BomListResponse {
        product: product.into(),
        boms: boms.into_iter().map(Into::into).collect(),
    }))
}
