use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sellable or consumable item. `code` is the user-facing product code;
/// finished goods sit in a level-4 category.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub category_id: i64,
    pub uom: Option<String>,
    pub active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product_category::Entity",
        from = "Column::CategoryId",
        to = "super::product_category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::bom_header::Entity")]
    BomHeaders,
    #[sea_orm(has_many = "super::bom_line::Entity")]
    BomLinesAsComponent,
    #[sea_orm(has_many = "super::purchase_order_line::Entity")]
    PurchaseOrderLines,
    #[sea_orm(has_many = "super::stock_valuation_layer::Entity")]
    StockValuationLayers,
}

impl Related<super::product_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::bom_header::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BomHeaders.def()
    }
}

impl Related<super::purchase_order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrderLines.def()
    }
}

impl Related<super::stock_valuation_layer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockValuationLayers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
