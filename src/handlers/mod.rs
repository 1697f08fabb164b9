pub mod categories;
pub mod common;
pub mod cost_analysis;
pub mod health;
pub mod products;

use crate::db::DbPool;
use crate::services::{catalog::CatalogService, costing::CostAnalysisService};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer behind the HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub costing: Arc<CostAnalysisService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, report_cache_capacity: usize) -> Self {
        Self {
            catalog: Arc::new(CatalogService::new(db_pool.clone())),
            costing: Arc::new(CostAnalysisService::new(db_pool, report_cache_capacity)),
        }
    }
}
