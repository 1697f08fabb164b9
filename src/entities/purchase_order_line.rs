use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a purchase order line. Only `purchase` and `done`
/// lines count as price evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum PurchaseState {
    #[sea_orm(string_value = "draft")]
    Draft,

    #[sea_orm(string_value = "sent")]
    Sent,

    #[sea_orm(string_value = "purchase")]
    Purchase,

    #[sea_orm(string_value = "done")]
    Done,

    #[sea_orm(string_value = "cancel")]
    Cancel,
}

impl fmt::Display for PurchaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseState::Draft => write!(f, "draft"),
            PurchaseState::Sent => write!(f, "sent"),
            PurchaseState::Purchase => write!(f, "purchase"),
            PurchaseState::Done => write!(f, "done"),
            PurchaseState::Cancel => write!(f, "cancel"),
        }
    }
}

/// Priced purchase line; the preferred source of component unit costs.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_order_lines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub po_line_id: i64,
    pub product_id: i64,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_price: Decimal,
    pub order_date: Date,
    pub state: PurchaseState,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
