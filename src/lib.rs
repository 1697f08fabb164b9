//! Product Cost Analysis API Library
//!
//! Read-only backend for a product cost dashboard: category drill-down,
//! product/BOM lookup, and recursive BOM cost roll-up over a trailing
//! window of purchase and valuation history.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod costing;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod openapi;
pub mod services;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

/// The versioned API surface
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/categories", handlers::categories::category_routes())
        .nest("/products", handlers::products::product_routes())
        .nest("/boms", handlers::cost_analysis::cost_analysis_routes())
}

/// The full application router: API, health probe, and API docs
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_router())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .with_state(state)
}
