use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    entities::{
        bom_header::{self, Entity as BomHeaderEntity},
        product::{self, Entity as ProductEntity},
        product_category::{self, Entity as CategoryEntity},
    },
    errors::ServiceError,
};

/// Category levels run 1 (division) through 4 (item category); products hang
/// off level 4.
pub const CATEGORY_LEVELS: i16 = 4;

/// Up to one selected category id per level. Levels may be skipped;
/// consistency is enforced against the nearest selected ancestor.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CategoryFilter {
    pub level1: Option<i64>,
    pub level2: Option<i64>,
    pub level3: Option<i64>,
    pub level4: Option<i64>,
}

impl CategoryFilter {
    /// Selections as (level, id), shallowest first
    fn selections(&self) -> Vec<(i16, i64)> {
        [self.level1, self.level2, self.level3, self.level4]
            .iter()
            .enumerate()
            .filter_map(|(idx, id)| id.map(|id| (idx as i16 + 1, id)))
            .collect()
    }
}

/// Outcome of resolving a category filter: the validated selection chain
/// (deepest last) and the choices available one level further down.
#[derive(Debug, Clone)]
pub struct CategoryResolution {
    pub selected: Vec<product_category::Model>,
    pub next_choices: Vec<product_category::Model>,
}

/// Read-only lookups over the category hierarchy, products, and BOM headers
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Resolves a drill-down filter: validates every selected category and
    /// its ancestry, then returns the selection chain plus the valid
    /// next-level choices.
    #[instrument(skip(self))]
    pub async fn resolve_categories(
        &self,
        filter: CategoryFilter,
    ) -> Result<CategoryResolution, ServiceError> {
        let db = &*self.db;

        let mut selected = Vec::new();
        for (level, id) in filter.selections() {
            let category = CategoryEntity::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::InvalidFilter(format!(
                        "unknown category {} selected at level {}",
                        id, level
                    ))
                })?;
            if category.level != level {
                return Err(ServiceError::InvalidFilter(format!(
                    "category '{}' is level {}, not level {}",
                    category.name, category.level, level
                )));
            }
            selected.push(category);
        }

        for pair in selected.windows(2) {
            self.assert_descendant(&pair[1], &pair[0]).await?;
        }

        let next_choices = match selected.last() {
            Some(deepest) if deepest.level >= CATEGORY_LEVELS => Vec::new(),
            Some(deepest) => {
                CategoryEntity::find()
                    .filter(product_category::Column::ParentId.eq(deepest.id))
                    .order_by_asc(product_category::Column::Name)
                    .all(db)
                    .await?
            }
            None => {
                CategoryEntity::find()
                    .filter(product_category::Column::Level.eq(1i16))
                    .order_by_asc(product_category::Column::Name)
                    .all(db)
                    .await?
            }
        };

        Ok(CategoryResolution {
            selected,
            next_choices,
        })
    }

    /// Walks `child`'s parent chain up to `ancestor`'s level and checks it
    /// lands on `ancestor`
    async fn assert_descendant(
        &self,
        child: &product_category::Model,
        ancestor: &product_category::Model,
    ) -> Result<(), ServiceError> {
        let db = &*self.db;
        let mut current = child.clone();
        while current.level > ancestor.level {
            let parent_id = current.parent_id.ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "category '{}' at level {} has no parent",
                    current.name, current.level
                ))
            })?;
            let parent = CategoryEntity::find_by_id(parent_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "category hierarchy is broken above '{}'",
                        current.name
                    ))
                })?;
            if parent.level != current.level - 1 {
                return Err(ServiceError::ValidationError(format!(
                    "category '{}' at level {} has a level-{} parent",
                    current.name, current.level, parent.level
                )));
            }
            current = parent;
        }
        if current.id != ancestor.id {
            return Err(ServiceError::InvalidFilter(format!(
                "category '{}' is not under '{}'",
                child.name, ancestor.name
            )));
        }
        Ok(())
    }

    /// Lists the active products of a category, descending to the level-4
    /// leaves first when given a higher-level category. Ordered by display
    /// name, then code, so the sequence is stable across equal names.
    #[instrument(skip(self))]
    pub async fn list_products(&self, category_id: i64) -> Result<Vec<product::Model>, ServiceError> {
        let db = &*self.db;

        let category = CategoryEntity::find_by_id(category_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", category_id)))?;

        let mut leaf_ids = vec![category.id];
        for _ in category.level..CATEGORY_LEVELS {
            if leaf_ids.is_empty() {
                break;
            }
            leaf_ids = CategoryEntity::find()
                .filter(product_category::Column::ParentId.is_in(leaf_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|c| c.id)
                .collect();
        }

        if leaf_ids.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "no products found in category '{}'",
                category.name
            )));
        }

        let products = ProductEntity::find()
            .filter(product::Column::CategoryId.is_in(leaf_ids))
            .filter(product::Column::Active.eq(true))
            .order_by_asc(product::Column::Name)
            .order_by_asc(product::Column::Code)
            .all(db)
            .await?;

        if products.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "no products found in category '{}'",
                category.name
            )));
        }

        info!(
            category = %category.name,
            count = products.len(),
            "products listed"
        );
        Ok(products)
    }

    /// Lists the active BOM versions of a product, newest effective first
    /// (ties broken by highest id, matching the sub-assembly version policy)
    #[instrument(skip(self))]
    pub async fn list_boms(
        &self,
        product_code: &str,
    ) -> Result<(product::Model, Vec<bom_header::Model>), ServiceError> {
        let db = &*self.db;

        let product = ProductEntity::find()
            .filter(product::Column::Code.eq(product_code))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", product_code))
            })?;

        let boms = BomHeaderEntity::find()
            .filter(bom_header::Column::ProductId.eq(product.id))
            .filter(bom_header::Column::Active.eq(true))
            .order_by_desc(bom_header::Column::EffectiveFrom)
            .order_by_desc(bom_header::Column::BomId)
            .all(db)
            .await?;

        if boms.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "no bill of materials defined for product '{}'",
                product_code
            )));
        }

        Ok((product, boms))
    }
}
