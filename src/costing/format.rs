use crate::costing::pricing::PriceSource;
use crate::costing::rollup::{CostNode, CostRollup, CostStatus, CostValue};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

/// One display row of the cost breakdown table. Rows come out in depth-first
/// pre-order (a parent immediately followed by its children, BOM line order
/// preserved), so the consumer can render them top to bottom with
/// indentation alone.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DisplayRow {
    /// Tree depth; the analyzed product itself is depth 0
    pub depth: u32,
    /// `" > "`-joined component names from the root to this row
    pub path: String,
    pub component_code: String,
    pub component_name: String,
    pub uom: Option<String>,
    #[schema(value_type = String)]
    pub quantity: Decimal,
    /// Unit cost, `null` while unavailable
    #[schema(value_type = Option<String>)]
    pub unit_cost: CostValue,
    /// Quantity-weighted subtotal, `null` while unavailable
    #[schema(value_type = Option<String>)]
    pub subtotal: CostValue,
    pub status: CostStatus,
    pub price_source: Option<PriceSource>,
    pub record_count: usize,
}

/// Projects the roll-up tree into display rows. Purely a reshaping: every
/// number is taken from the tree as-is.
pub fn display_rows(rollup: &CostRollup) -> Vec<DisplayRow> {
    let mut rows = Vec::new();
    push_rows(&rollup.root, 0, "", &mut rows);
    rows
}

fn push_rows(node: &CostNode, depth: u32, parent_path: &str, rows: &mut Vec<DisplayRow>) {
    let path = if parent_path.is_empty() {
        node.component_name.clone()
    } else {
        format!("{} > {}", parent_path, node.component_name)
    };
    rows.push(DisplayRow {
        depth,
        path: path.clone(),
        component_code: node.component_code.clone(),
        component_name: node.component_name.clone(),
        uom: node.uom.clone(),
        quantity: node.quantity,
        unit_cost: node.unit_cost,
        subtotal: node.subtotal,
        status: node.status,
        price_source: node.price_source,
        record_count: node.record_count,
    });
    for child in &node.children {
        push_rows(child, depth + 1, &path, rows);
    }
}
