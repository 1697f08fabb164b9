use crate::costing::period::{CostWindow, Period};
use crate::errors::ServiceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use utoipa::ToSchema;

/// Where a unit cost came from. Purchase order lines are authoritative;
/// valuation layers fill the gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    PurchaseOrder,
    StockValuation,
}

/// One unit-cost observation for a component in a calendar month
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub component_id: i64,
    pub period: Period,
    pub unit_cost: Decimal,
    pub source: PriceSource,
}

/// Aggregated leaf cost for one component over a window
#[derive(Debug, Clone, PartialEq)]
pub struct LeafCost {
    pub unit_cost: Decimal,
    pub source: PriceSource,
    /// Distinct periods that contributed to the average
    pub periods_sampled: usize,
    /// Raw records behind the average
    pub record_count: usize,
}

/// Unit costs per component, restricted to an analysis window.
///
/// The window end is anchored at the latest period present in the records,
/// not at the current date: data feeds lag, and a window hanging off "now"
/// would silently go empty.
#[derive(Debug, Clone)]
pub struct PriceBook {
    window_start: Period,
    window_end: Period,
    leaf_costs: HashMap<i64, LeafCost>,
}

impl PriceBook {
    /// Builds the book for `window` ending at the latest period present in
    /// `records`. Fails with `DataUnavailable` when there are no records at
    /// all, since then no window can even be anchored.
    pub fn build(records: &[PriceRecord], window: CostWindow) -> Result<Self, ServiceError> {
        let window_end = records
            .iter()
            .map(|r| r.period)
            .max()
            .ok_or_else(|| {
                ServiceError::DataUnavailable(
                    "no purchase or valuation records exist for any component of this BOM"
                        .to_string(),
                )
            })?;
        let window_start = window.start(window_end);
        Ok(Self::restricted(records, window_start, window_end))
    }

    /// Book restricted to a single period; used for per-month cost trends.
    /// May be empty, in which case every leaf resolves as unavailable.
    pub fn for_single_period(records: &[PriceRecord], period: Period) -> Self {
        Self::restricted(records, period, period)
    }

    fn restricted(records: &[PriceRecord], window_start: Period, window_end: Period) -> Self {
        let mut po: HashMap<i64, BTreeMap<Period, Vec<Decimal>>> = HashMap::new();
        let mut svl: HashMap<i64, BTreeMap<Period, Vec<Decimal>>> = HashMap::new();

        for record in records {
            if record.period < window_start || record.period > window_end {
                continue;
            }
            let by_period = match record.source {
                PriceSource::PurchaseOrder => po.entry(record.component_id).or_default(),
                PriceSource::StockValuation => svl.entry(record.component_id).or_default(),
            };
            by_period
                .entry(record.period)
                .or_default()
                .push(record.unit_cost);
        }

        let mut leaf_costs = HashMap::new();
        for (component_id, by_period) in po {
            leaf_costs.insert(
                component_id,
                aggregate(&by_period, PriceSource::PurchaseOrder),
            );
        }
        for (component_id, by_period) in svl {
            // Valuation layers only price components no purchase line covers
            leaf_costs
                .entry(component_id)
                .or_insert_with(|| aggregate(&by_period, PriceSource::StockValuation));
        }

        debug!(
            window_start = %window_start,
            window_end = %window_end,
            components_priced = leaf_costs.len(),
            "price book assembled"
        );

        Self {
            window_start,
            window_end,
            leaf_costs,
        }
    }

    pub fn window_start(&self) -> Period {
        self.window_start
    }

    pub fn window_end(&self) -> Period {
        self.window_end
    }

    /// Aggregated unit cost for a component, `None` when no source priced it
    /// inside the window
    pub fn unit_cost(&self, component_id: i64) -> Option<&LeafCost> {
        self.leaf_costs.get(&component_id)
    }
}

/// Mean of per-period means: records are averaged within their period first
/// so a month with many orders does not outweigh a month with one.
fn aggregate(by_period: &BTreeMap<Period, Vec<Decimal>>, source: PriceSource) -> LeafCost {
    let mut period_means = Vec::with_capacity(by_period.len());
    let mut record_count = 0;
    for costs in by_period.values() {
        record_count += costs.len();
        period_means.push(mean(costs));
    }
    LeafCost {
        unit_cost: mean(&period_means),
        source,
        periods_sampled: by_period.len(),
        record_count,
    }
}

fn mean(values: &[Decimal]) -> Decimal {
    let sum: Decimal = values.iter().copied().sum();
    sum / Decimal::from(values.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn po(component_id: i64, year: i32, month: u32, cost: Decimal) -> PriceRecord {
        PriceRecord {
            component_id,
            period: Period::new(year, month).unwrap(),
            unit_cost: cost,
            source: PriceSource::PurchaseOrder,
        }
    }

    fn svl(component_id: i64, year: i32, month: u32, cost: Decimal) -> PriceRecord {
        PriceRecord {
            component_id,
            period: Period::new(year, month).unwrap(),
            unit_cost: cost,
            source: PriceSource::StockValuation,
        }
    }

    #[test]
    fn empty_record_set_is_data_unavailable() {
        let err = PriceBook::build(&[], CostWindow::SixMonths).unwrap_err();
        assert!(matches!(err, ServiceError::DataUnavailable(_)));
    }

    #[test]
    fn window_end_is_latest_period_in_data() {
        let records = vec![po(1, 2025, 3, dec!(10)), po(1, 2025, 6, dec!(20))];
        let book = PriceBook::build(&records, CostWindow::ThreeMonths).unwrap();
        assert_eq!(book.window_end(), Period::new(2025, 6).unwrap());
        assert_eq!(book.window_start(), Period::new(2025, 4).unwrap());
        // The March record falls outside the anchored 3-month window
        let leaf = book.unit_cost(1).unwrap();
        assert_eq!(leaf.unit_cost, dec!(20));
        assert_eq!(leaf.record_count, 1);
    }

    #[test]
    fn purchase_orders_shadow_valuation_layers() {
        let records = vec![
            po(1, 2025, 6, dec!(10)),
            svl(1, 2025, 6, dec!(99)),
            svl(1, 2025, 5, dec!(99)),
        ];
        let book = PriceBook::build(&records, CostWindow::SixMonths).unwrap();
        let leaf = book.unit_cost(1).unwrap();
        assert_eq!(leaf.source, PriceSource::PurchaseOrder);
        assert_eq!(leaf.unit_cost, dec!(10));
    }

    #[test]
    fn valuation_layers_price_uncovered_components() {
        let records = vec![po(1, 2025, 6, dec!(10)), svl(2, 2025, 5, dec!(5))];
        let book = PriceBook::build(&records, CostWindow::SixMonths).unwrap();
        let leaf = book.unit_cost(2).unwrap();
        assert_eq!(leaf.source, PriceSource::StockValuation);
        assert_eq!(leaf.unit_cost, dec!(5));
        assert!(book.unit_cost(3).is_none());
    }

    #[test]
    fn averaging_is_per_period_then_across_periods() {
        // May: (10 + 20) / 2 = 15; June: 30. Across periods: (15 + 30) / 2
        let records = vec![
            po(1, 2025, 5, dec!(10)),
            po(1, 2025, 5, dec!(20)),
            po(1, 2025, 6, dec!(30)),
        ];
        let book = PriceBook::build(&records, CostWindow::SixMonths).unwrap();
        let leaf = book.unit_cost(1).unwrap();
        assert_eq!(leaf.unit_cost, dec!(22.5));
        assert_eq!(leaf.periods_sampled, 2);
        assert_eq!(leaf.record_count, 3);
    }

    #[test]
    fn single_period_book_ignores_other_months() {
        let records = vec![po(1, 2025, 5, dec!(10)), po(1, 2025, 6, dec!(30))];
        let book = PriceBook::for_single_period(&records, Period::new(2025, 5).unwrap());
        assert_eq!(book.unit_cost(1).unwrap().unit_cost, dec!(10));
    }
}
