use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One recipe for producing a product. A product may carry several versions;
/// `effective_from` (newest wins, ties broken by highest `bom_id`) decides
/// which one sub-assemblies default to. `output_qty` is the quantity of the
/// product one pass of the recipe yields; line quantities are stated against
/// it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bom_headers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub bom_id: i64,
    pub product_id: i64,
    pub code: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub output_qty: Decimal,
    pub effective_from: Date,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(has_many = "super::bom_line::Entity")]
    BomLines,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::bom_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BomLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
