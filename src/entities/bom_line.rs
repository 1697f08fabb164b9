use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Edge of the BOM tree: `quantity` units of the component go into
/// `output_qty` units of the parent (see `bom_header`). `line_no` fixes the
/// display order.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bom_lines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub bom_line_id: i64,
    pub bom_id: i64,
    pub component_id: i64,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    pub line_no: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bom_header::Entity",
        from = "Column::BomId",
        to = "super::bom_header::Column::BomId"
    )]
    BomHeader,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ComponentId",
        to = "super::product::Column::Id"
    )]
    Component,
}

impl Related<super::bom_header::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BomHeader.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Component.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
