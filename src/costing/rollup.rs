use crate::costing::graph::BomGraph;
use crate::costing::period::Period;
use crate::costing::pricing::{PriceBook, PriceSource};
use crate::errors::ServiceError;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

/// Traversal guard for degenerate data; genuine BOMs are a handful of
/// levels deep.
pub const MAX_BOM_DEPTH: usize = 32;

/// Per-node outcome of the roll-up. `Cyclic` marks the node where a
/// sub-branch re-entered its own ancestor path; its ancestors report
/// `Unavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CostStatus {
    Computed,
    Unavailable,
    Cyclic,
}

/// A cost that is either known or explicitly missing. Missing data is never
/// coerced to zero: that would silently understate every ancestor total.
///
/// Serializes as the bare number, or `null` when unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CostValue {
    Computed(Decimal),
    Unavailable,
}

impl CostValue {
    pub fn is_computed(&self) -> bool {
        matches!(self, CostValue::Computed(_))
    }

    pub fn computed(&self) -> Option<Decimal> {
        match self {
            CostValue::Computed(value) => Some(*value),
            CostValue::Unavailable => None,
        }
    }

    /// Multiplies by a quantity, propagating unavailability
    pub fn scale(&self, quantity: Decimal) -> CostValue {
        match self {
            CostValue::Computed(value) => CostValue::Computed(*value * quantity),
            CostValue::Unavailable => CostValue::Unavailable,
        }
    }
}

/// One node of the annotated cost tree, mirroring the BOM structure
#[derive(Debug, Clone, Serialize)]
pub struct CostNode {
    pub component_id: i64,
    pub component_code: String,
    pub component_name: String,
    pub uom: Option<String>,
    /// Quantity per single unit of the parent (1 for the root)
    pub quantity: Decimal,
    pub unit_cost: CostValue,
    pub subtotal: CostValue,
    pub status: CostStatus,
    /// For terminal components, which record set priced them
    pub price_source: Option<PriceSource>,
    /// For terminal components, how many records back the average
    pub record_count: usize,
    pub children: Vec<CostNode>,
}

/// Result of rolling up one BOM over one window
#[derive(Debug, Clone, Serialize)]
pub struct CostRollup {
    pub root_bom_id: i64,
    pub window_start: Period,
    pub window_end: Period,
    pub root: CostNode,
    pub total_cost: CostValue,
}

struct Walker<'a> {
    graph: &'a BomGraph,
    prices: &'a PriceBook,
    /// Ancestor chain of the node being visited: (component id, code)
    path: Vec<(i64, String)>,
}

impl Walker<'_> {
    fn visit(&mut self, component_id: i64, quantity: Decimal) -> Result<CostNode, ServiceError> {
        let component = self
            .graph
            .component(component_id)
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "component {} referenced by a BOM line is missing from the graph",
                    component_id
                ))
            })?
            .clone();

        if let Some(pos) = self.path.iter().position(|(id, _)| *id == component_id) {
            let mut cycle: Vec<String> =
                self.path[pos..].iter().map(|(_, code)| code.clone()).collect();
            cycle.push(component.code.clone());
            warn!(path = %cycle.join(" > "), "cycle detected in BOM structure");
            if pos == 0 {
                // The analysis root contains itself: no partial tree is
                // meaningful, abort the whole roll-up
                return Err(ServiceError::CyclicBom { path: cycle });
            }
            return Ok(CostNode {
                component_id,
                component_code: component.code,
                component_name: component.name,
                uom: component.uom,
                quantity,
                unit_cost: CostValue::Unavailable,
                subtotal: CostValue::Unavailable,
                status: CostStatus::Cyclic,
                price_source: None,
                record_count: 0,
                children: Vec::new(),
            });
        }

        if self.path.len() >= MAX_BOM_DEPTH {
            return Err(ServiceError::ValidationError(format!(
                "BOM nesting exceeds {} levels at component {}",
                MAX_BOM_DEPTH, component.code
            )));
        }

        let node = match self.graph.bom_for(component_id).cloned() {
            Some(bom) => {
                self.path.push((component_id, component.code.clone()));
                let mut children = Vec::with_capacity(bom.lines.len());
                for line in &bom.lines {
                    children.push(self.visit(line.component_id, line.quantity_per_unit)?);
                }
                self.path.pop();

                let mut sum = Decimal::ZERO;
                let mut complete = true;
                for child in &children {
                    match child.subtotal {
                        CostValue::Computed(value) => sum += value,
                        CostValue::Unavailable => complete = false,
                    }
                }
                let unit_cost = if complete {
                    CostValue::Computed(sum)
                } else {
                    CostValue::Unavailable
                };
                CostNode {
                    component_id,
                    component_code: component.code,
                    component_name: component.name,
                    uom: component.uom,
                    quantity,
                    subtotal: unit_cost.scale(quantity),
                    status: if complete {
                        CostStatus::Computed
                    } else {
                        CostStatus::Unavailable
                    },
                    unit_cost,
                    price_source: None,
                    record_count: 0,
                    children,
                }
            }
            None => match self.prices.unit_cost(component_id) {
                Some(leaf) => CostNode {
                    component_id,
                    component_code: component.code,
                    component_name: component.name,
                    uom: component.uom,
                    quantity,
                    unit_cost: CostValue::Computed(leaf.unit_cost),
                    subtotal: CostValue::Computed(leaf.unit_cost * quantity),
                    status: CostStatus::Computed,
                    price_source: Some(leaf.source),
                    record_count: leaf.record_count,
                    children: Vec::new(),
                },
                None => {
                    debug!(
                        component = %component.code,
                        "no price records in window, marking cost unavailable"
                    );
                    CostNode {
                        component_id,
                        component_code: component.code,
                        component_name: component.name,
                        uom: component.uom,
                        quantity,
                        unit_cost: CostValue::Unavailable,
                        subtotal: CostValue::Unavailable,
                        status: CostStatus::Unavailable,
                        price_source: None,
                        record_count: 0,
                        children: Vec::new(),
                    }
                }
            },
        };

        Ok(node)
    }
}

/// Rolls the BOM graph up against the price book.
///
/// Returns the full annotated tree even when branches lack data; only a
/// cycle through the root aborts with `CyclicBom`.
pub fn roll_up(graph: &BomGraph, prices: &PriceBook) -> Result<CostRollup, ServiceError> {
    let root_bom = graph.bom_for(graph.root_id()).ok_or_else(|| {
        ServiceError::InternalError("root component has no BOM in the assembled graph".to_string())
    })?;
    let root_bom_id = root_bom.bom_id;

    let mut walker = Walker {
        graph,
        prices,
        path: Vec::new(),
    };
    let root = walker.visit(graph.root_id(), Decimal::ONE)?;
    let total_cost = root.subtotal;

    Ok(CostRollup {
        root_bom_id,
        window_start: prices.window_start(),
        window_end: prices.window_end(),
        root,
        total_cost,
    })
}
