//! Pure cost analysis core: calendar periods and analysis windows, price
//! aggregation, the BOM graph, the recursive cost roll-up, and the
//! display-row projection. Nothing in here touches the database; the service
//! layer assembles the inputs and calls in.

pub mod format;
pub mod graph;
pub mod period;
pub mod pricing;
pub mod rollup;

pub use format::{display_rows, DisplayRow};
pub use graph::{BomGraph, BomLineSpec, BomSpec, ComponentRef};
pub use period::{CostWindow, Period};
pub use pricing::{LeafCost, PriceBook, PriceRecord, PriceSource};
pub use rollup::{roll_up, CostNode, CostRollup, CostStatus, CostValue};
