use dashmap::DashMap;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::{
    costing::{
        display_rows, roll_up, BomGraph, BomLineSpec, BomSpec, ComponentRef, CostStatus,
        CostValue, CostWindow, Period, PriceBook, PriceRecord, PriceSource, DisplayRow,
    },
    entities::{
        bom_header::{self, Entity as BomHeaderEntity},
        bom_line::{self, Entity as BomLineEntity},
        product::{self, Entity as ProductEntity},
        purchase_order_line::{self, Entity as PurchaseOrderLineEntity, PurchaseState},
        stock_valuation_layer::{self, Entity as StockValuationLayerEntity},
    },
    errors::ServiceError,
};

/// Finished cost breakdown for one BOM over one window, shaped for display
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CostReport {
    pub product_code: String,
    pub product_name: String,
    pub bom_id: i64,
    pub bom_code: Option<String>,
    pub window_months: u32,
    #[schema(value_type = String)]
    pub window_start: Period,
    #[schema(value_type = String)]
    pub window_end: Period,
    pub status: CostStatus,
    /// Grand total per product unit, `null` while any branch lacks data
    #[schema(value_type = Option<String>)]
    pub total_cost: CostValue,
    pub rows: Vec<DisplayRow>,
}

/// One point of the per-month cost trend
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CostTrendPoint {
    #[schema(value_type = String)]
    pub period: Period,
    #[schema(value_type = Option<String>)]
    pub total_cost: CostValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ReportCacheKey {
    bom_id: i64,
    window: CostWindow,
    window_end: Period,
}

/// Everything the pure core needs for one analysis, loaded in one pass
struct AnalysisInputs {
    header: bom_header::Model,
    root: product::Model,
    graph: BomGraph,
    records: Vec<PriceRecord>,
}

/// Cost analysis over a BOM: expands the transitive component closure,
/// fetches the price history, and rolls the tree up against the windowed
/// price book.
#[derive(Clone)]
pub struct CostAnalysisService {
    db: Arc<DatabaseConnection>,
    report_cache: Arc<DashMap<ReportCacheKey, Arc<CostReport>>>,
    cache_capacity: usize,
}

impl CostAnalysisService {
    pub fn new(db: Arc<DatabaseConnection>, cache_capacity: usize) -> Self {
        Self {
            db,
            report_cache: Arc::new(DashMap::new()),
            cache_capacity,
        }
    }

    /// Computes (or serves from cache) the cost breakdown for `bom_id` over
    /// a trailing window of `window_months` months.
    ///
    /// The cache key includes the latest period present in the price data,
    /// so a report computed before new data arrived can never be served
    /// once the window has moved.
    #[instrument(skip(self))]
    pub async fn analyze(
        &self,
        bom_id: i64,
        window_months: u32,
    ) -> Result<Arc<CostReport>, ServiceError> {
        let window = CostWindow::try_from(window_months)?;
        let inputs = self.load_analysis_inputs(bom_id).await?;
        let book = PriceBook::build(&inputs.records, window)?;

        let key = ReportCacheKey {
            bom_id,
            window,
            window_end: book.window_end(),
        };
        if let Some(hit) = self.report_cache.get(&key) {
            debug!(bom_id, window_end = %key.window_end, "serving cached cost report");
            return Ok(hit.clone());
        }

        let rollup = roll_up(&inputs.graph, &book)?;
        let rows = display_rows(&rollup);
        let report = Arc::new(CostReport {
            product_code: inputs.root.code,
            product_name: inputs.root.name,
            bom_id,
            bom_code: inputs.header.code,
            window_months: window.months(),
            window_start: rollup.window_start,
            window_end: rollup.window_end,
            status: rollup.root.status,
            total_cost: rollup.total_cost,
            rows,
        });

        // Drop reports superseded by a newer latest-available-period
        self.report_cache
            .retain(|k, _| !(k.bom_id == bom_id && k.window == window && k.window_end < key.window_end));
        if self.report_cache.len() >= self.cache_capacity {
            self.report_cache.clear();
        }
        self.report_cache.insert(key, report.clone());

        info!(
            bom_id,
            product = %report.product_code,
            total = ?report.total_cost,
            "cost analysis computed"
        );
        Ok(report)
    }

    /// Per-month totals over the window: the same roll-up, with leaf costs
    /// restricted to each single period in turn. Months where a leaf has no
    /// data report an unavailable total.
    #[instrument(skip(self))]
    pub async fn cost_trend(
        &self,
        bom_id: i64,
        window_months: u32,
    ) -> Result<Vec<CostTrendPoint>, ServiceError> {
        let window = CostWindow::try_from(window_months)?;
        let inputs = self.load_analysis_inputs(bom_id).await?;
        let anchored = PriceBook::build(&inputs.records, window)?;

        let mut points = Vec::with_capacity(window.months() as usize);
        for period in window.periods(anchored.window_end()) {
            let book = PriceBook::for_single_period(&inputs.records, period);
            let rollup = roll_up(&inputs.graph, &book)?;
            points.push(CostTrendPoint {
                period,
                total_cost: rollup.total_cost,
            });
        }
        Ok(points)
    }

    /// Loads the BOM closure and price history behind one analysis.
    ///
    /// Expansion is breadth-first with a resolved-set so each component is
    /// looked up exactly once; cyclic data therefore cannot loop the
    /// expansion, it only shows up later as re-entry during the roll-up.
    async fn load_analysis_inputs(&self, bom_id: i64) -> Result<AnalysisInputs, ServiceError> {
        let db = &*self.db;

        let header = BomHeaderEntity::find_by_id(bom_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("BOM {} not found", bom_id)))?;

        let root = ProductEntity::find_by_id(header.product_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "BOM {} references missing product {}",
                    bom_id, header.product_id
                ))
            })?;

        let mut graph = BomGraph::new(component_ref(&root));
        let mut resolved: HashSet<i64> = HashSet::from([root.id]);
        let mut pending: VecDeque<(i64, bom_header::Model)> =
            VecDeque::from([(root.id, header.clone())]);

        while let Some((component_id, bom)) = pending.pop_front() {
            let lines = BomLineEntity::find()
                .filter(bom_line::Column::BomId.eq(bom.bom_id))
                .order_by_asc(bom_line::Column::LineNo)
                .all(db)
                .await?;
            graph.set_bom(component_id, bom_spec(&bom, &lines)?);

            for line in &lines {
                if resolved.insert(line.component_id) {
                    let candidates = BomHeaderEntity::find()
                        .filter(bom_header::Column::ProductId.eq(line.component_id))
                        .filter(bom_header::Column::Active.eq(true))
                        .all(db)
                        .await?;
                    if let Some(sub_bom) = pick_effective(candidates) {
                        pending.push_back((line.component_id, sub_bom));
                    }
                }
            }
        }

        let mut component_ids: Vec<i64> = resolved.iter().copied().filter(|id| *id != root.id).collect();
        component_ids.sort_unstable();

        if component_ids.is_empty() {
            return Err(ServiceError::DataUnavailable(format!(
                "BOM {} has no component lines",
                bom_id
            )));
        }

        let components = ProductEntity::find()
            .filter(product::Column::Id.is_in(component_ids.clone()))
            .all(db)
            .await?;
        let mut found: HashSet<i64> = HashSet::new();
        for component in &components {
            found.insert(component.id);
            graph.add_component(component_ref(component));
        }
        if let Some(missing) = component_ids.iter().find(|id| !found.contains(*id)) {
            return Err(ServiceError::ValidationError(format!(
                "component {} referenced by BOM lines is missing from the product master",
                missing
            )));
        }

        let records = self.fetch_price_records(&component_ids).await?;
        debug!(
            bom_id,
            components = component_ids.len(),
            records = records.len(),
            "analysis inputs loaded"
        );

        Ok(AnalysisInputs {
            header,
            root,
            graph,
            records,
        })
    }

    /// All price evidence for the given components: confirmed purchase lines
    /// plus valuation layers. Window restriction happens in the price book,
    /// which first has to see every period to anchor the window end.
    async fn fetch_price_records(
        &self,
        component_ids: &[i64],
    ) -> Result<Vec<PriceRecord>, ServiceError> {
        let db = &*self.db;

        let mut records = Vec::new();

        let purchase_lines = PurchaseOrderLineEntity::find()
            .filter(purchase_order_line::Column::ProductId.is_in(component_ids.to_vec()))
            .filter(
                purchase_order_line::Column::State
                    .is_in([PurchaseState::Purchase, PurchaseState::Done]),
            )
            .all(db)
            .await?;
        records.extend(purchase_lines.into_iter().map(|line| PriceRecord {
            component_id: line.product_id,
            period: Period::from_date(line.order_date),
            unit_cost: line.unit_price,
            source: PriceSource::PurchaseOrder,
        }));

        let layers = StockValuationLayerEntity::find()
            .filter(stock_valuation_layer::Column::ProductId.is_in(component_ids.to_vec()))
            .all(db)
            .await?;
        records.extend(layers.into_iter().map(|layer| PriceRecord {
            component_id: layer.product_id,
            period: Period::from_date(layer.entry_date),
            unit_cost: layer.unit_cost,
            source: PriceSource::StockValuation,
        }));

        Ok(records)
    }
}

fn component_ref(product: &product::Model) -> ComponentRef {
    ComponentRef {
        id: product.id,
        code: product.code.clone(),
        name: product.name.clone(),
        uom: product.uom.clone(),
    }
}

/// Normalizes BOM lines to quantity per single parent unit
fn bom_spec(header: &bom_header::Model, lines: &[bom_line::Model]) -> Result<BomSpec, ServiceError> {
    if header.output_qty <= rust_decimal::Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "BOM {} has non-positive output quantity {}",
            header.bom_id, header.output_qty
        )));
    }
    let mut specs = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= rust_decimal::Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "BOM line {} has non-positive quantity {}",
                line.bom_line_id, line.quantity
            )));
        }
        specs.push(BomLineSpec {
            component_id: line.component_id,
            quantity_per_unit: line.quantity / header.output_qty,
        });
    }
    Ok(BomSpec {
        bom_id: header.bom_id,
        lines: specs,
    })
}

/// Version policy for sub-assemblies: latest effective date wins, ties
/// broken by highest BOM id
fn pick_effective(candidates: Vec<bom_header::Model>) -> Option<bom_header::Model> {
    candidates
        .into_iter()
        .max_by_key(|bom| (bom.effective_from, bom.bom_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn header(bom_id: i64, effective_from: NaiveDate) -> bom_header::Model {
        bom_header::Model {
            bom_id,
            product_id: 1,
            code: None,
            output_qty: dec!(1),
            effective_from,
            active: true,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn latest_effective_date_wins() {
        let older = header(10, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let newer = header(5, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        let picked = pick_effective(vec![older, newer]).unwrap();
        assert_eq!(picked.bom_id, 5);
    }

    #[test]
    fn effective_date_ties_break_on_highest_id() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let picked = pick_effective(vec![header(7, date), header(9, date), header(8, date)]).unwrap();
        assert_eq!(picked.bom_id, 9);
    }

    #[test]
    fn no_candidates_means_terminal_component() {
        assert!(pick_effective(Vec::new()).is_none());
    }

    #[test]
    fn line_quantities_are_normalized_by_output_qty() {
        let mut bom = header(1, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        bom.output_qty = dec!(4);
        let line = bom_line::Model {
            bom_line_id: 1,
            bom_id: 1,
            component_id: 2,
            quantity: dec!(10),
            line_no: 1,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        };
        let spec = bom_spec(&bom, &[line]).unwrap();
        assert_eq!(spec.lines[0].quantity_per_unit, dec!(2.5));
    }

    #[test]
    fn non_positive_output_qty_is_rejected() {
        let mut bom = header(1, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        bom.output_qty = dec!(0);
        let err = bom_spec(&bom, &[]).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
