//! End-to-end tests for `CostAnalysisService` over a mock database: closure
//! expansion, sub-BOM version choice, windowed averaging with fallback, the
//! report cache, and the error taxonomy.

use chrono::{NaiveDate, Utc};
use prodcost_api::{
    costing::{CostStatus, CostValue, Period, PriceSource},
    entities::{bom_header, bom_line, product, purchase_order_line, stock_valuation_layer},
    errors::ServiceError,
    services::costing::CostAnalysisService,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{DatabaseBackend, MockDatabase};
use std::sync::Arc;

fn product(id: i64, code: &str, name: &str) -> product::Model {
    product::Model {
        id,
        code: code.to_string(),
        name: name.to_string(),
        category_id: 40,
        uom: Some("EA".to_string()),
        active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn bom(bom_id: i64, product_id: i64, output_qty: Decimal, effective: (i32, u32)) -> bom_header::Model {
    bom_header::Model {
        bom_id,
        product_id,
        code: Some(format!("BOM-{}", bom_id)),
        output_qty,
        effective_from: NaiveDate::from_ymd_opt(effective.0, effective.1, 1).unwrap(),
        active: true,
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

fn line(bom_line_id: i64, bom_id: i64, component_id: i64, quantity: Decimal, line_no: i32) -> bom_line::Model {
    bom_line::Model {
        bom_line_id,
        bom_id,
        component_id,
        quantity,
        line_no,
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

fn po(
    po_line_id: i64,
    product_id: i64,
    unit_price: Decimal,
    date: (i32, u32, u32),
) -> purchase_order_line::Model {
    purchase_order_line::Model {
        po_line_id,
        product_id,
        unit_price,
        order_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        state: purchase_order_line::PurchaseState::Purchase,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn svl(
    layer_id: i64,
    product_id: i64,
    unit_cost: Decimal,
    date: (i32, u32, u32),
) -> stock_valuation_layer::Model {
    stock_valuation_layer::Model {
        layer_id,
        product_id,
        unit_cost,
        quantity: dec!(1),
        entry_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Mock for the flat scenario: P1 (product 100, BOM 1) = { C1 x2, C2 x3 },
/// both components terminal. Purchase and valuation results are supplied by
/// the caller.
fn flat_bom_mock(
    purchase: Vec<purchase_order_line::Model>,
    valuation: Vec<stock_valuation_layer::Model>,
) -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![bom(1, 100, dec!(1), (2025, 1))]])
        .append_query_results([vec![product(100, "P1", "Product One")]])
        .append_query_results([vec![
            line(1, 1, 101, dec!(2), 1),
            line(2, 1, 102, dec!(3), 2),
        ]])
        .append_query_results([
            Vec::<bom_header::Model>::new(),
            Vec::<bom_header::Model>::new(),
        ])
        .append_query_results([vec![
            product(101, "C1", "Component One"),
            product(102, "C2", "Component Two"),
        ]])
        .append_query_results([purchase])
        .append_query_results([valuation])
}

#[tokio::test]
async fn purchase_average_with_valuation_fallback_computes_the_total() {
    // C1 averages 10 over two purchase months; C2 has no purchase lines and
    // falls back to a valuation average of 5. Total: 2*10 + 3*5 = 35.
    let db = flat_bom_mock(
        vec![
            po(1, 101, dec!(8), (2025, 5, 10)),
            po(2, 101, dec!(12), (2025, 6, 2)),
        ],
        vec![svl(1, 102, dec!(5), (2025, 6, 15))],
    )
    .into_connection();
    let service = CostAnalysisService::new(Arc::new(db), 16);

    let report = service.analyze(1, 6).await.unwrap();

    assert_eq!(report.product_code, "P1");
    assert_eq!(report.bom_code.as_deref(), Some("BOM-1"));
    assert_eq!(report.window_months, 6);
    assert_eq!(report.window_end, Period::new(2025, 6).unwrap());
    assert_eq!(report.window_start, Period::new(2025, 1).unwrap());
    assert_eq!(report.status, CostStatus::Computed);
    assert_eq!(report.total_cost, CostValue::Computed(dec!(35)));

    let c1 = report.rows.iter().find(|r| r.component_code == "C1").unwrap();
    assert_eq!(c1.subtotal, CostValue::Computed(dec!(20)));
    assert_eq!(c1.price_source, Some(PriceSource::PurchaseOrder));

    let c2 = report.rows.iter().find(|r| r.component_code == "C2").unwrap();
    assert_eq!(c2.subtotal, CostValue::Computed(dec!(15)));
    assert_eq!(c2.price_source, Some(PriceSource::StockValuation));
}

#[tokio::test]
async fn component_without_any_records_degrades_the_total() {
    // C2 has zero records of either kind: its subtotal and the grand total
    // are unavailable, C1 still reports 20
    let db = flat_bom_mock(
        vec![
            po(1, 101, dec!(8), (2025, 5, 10)),
            po(2, 101, dec!(12), (2025, 6, 2)),
        ],
        vec![],
    )
    .into_connection();
    let service = CostAnalysisService::new(Arc::new(db), 16);

    let report = service.analyze(1, 6).await.unwrap();

    assert_eq!(report.status, CostStatus::Unavailable);
    assert_eq!(report.total_cost, CostValue::Unavailable);

    let c1 = report.rows.iter().find(|r| r.component_code == "C1").unwrap();
    assert_eq!(c1.subtotal, CostValue::Computed(dec!(20)));

    let c2 = report.rows.iter().find(|r| r.component_code == "C2").unwrap();
    assert_eq!(c2.status, CostStatus::Unavailable);
    assert_eq!(c2.subtotal, CostValue::Unavailable);
}

#[tokio::test]
async fn window_other_than_the_enumerated_three_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let service = CostAnalysisService::new(Arc::new(db), 16);

    let err = service.analyze(1, 7).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidWindow(7)), "{:?}", err);
}

#[tokio::test]
async fn no_price_evidence_at_all_is_data_unavailable() {
    let db = flat_bom_mock(vec![], vec![]).into_connection();
    let service = CostAnalysisService::new(Arc::new(db), 16);

    let err = service.analyze(1, 6).await.unwrap_err();
    assert!(matches!(err, ServiceError::DataUnavailable(_)), "{:?}", err);
}

#[tokio::test]
async fn unknown_bom_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<bom_header::Model>::new()])
        .into_connection();
    let service = CostAnalysisService::new(Arc::new(db), 16);

    let err = service.analyze(99, 6).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn sub_assembly_uses_latest_effective_bom_and_normalizes_output_qty() {
    // P (100, BOM 1) -> A (101) x1. A has two BOM versions; the 2025 one
    // (id 11, output_qty 2) must win over the 2024 one. A's recipe is 4 x C
    // (102) per 2 output units, so 2 per unit; C costs 3.
    // Expected total: 1 * (2 * 3) = 6.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![bom(1, 100, dec!(1), (2025, 1))]])
        .append_query_results([vec![product(100, "P", "Parent")]])
        .append_query_results([vec![line(1, 1, 101, dec!(1), 1)]])
        .append_query_results([vec![
            bom(10, 101, dec!(1), (2024, 1)),
            bom(11, 101, dec!(2), (2025, 2)),
        ]])
        .append_query_results([vec![line(2, 11, 102, dec!(4), 1)]])
        .append_query_results([Vec::<bom_header::Model>::new()])
        .append_query_results([vec![
            product(101, "A", "Assembly"),
            product(102, "C", "Component"),
        ]])
        .append_query_results([vec![po(1, 102, dec!(3), (2025, 6, 1))]])
        .append_query_results([Vec::<stock_valuation_layer::Model>::new()])
        .into_connection();
    let service = CostAnalysisService::new(Arc::new(db), 16);

    let report = service.analyze(1, 6).await.unwrap();

    assert_eq!(report.total_cost, CostValue::Computed(dec!(6)));
    let a = report.rows.iter().find(|r| r.component_code == "A").unwrap();
    assert_eq!(a.unit_cost, CostValue::Computed(dec!(6)));
    let c = report.rows.iter().find(|r| r.component_code == "C").unwrap();
    assert_eq!(c.quantity, dec!(2));
    assert_eq!(c.subtotal, CostValue::Computed(dec!(6)));
}

#[tokio::test]
async fn repeated_analysis_with_unchanged_data_hits_the_cache() {
    // Two full passes over the same data: the second still reloads inputs
    // (to learn the latest available period) but must serve the cached
    // report object
    let purchase = vec![po(1, 101, dec!(10), (2025, 6, 1))];
    let valuation = vec![svl(1, 102, dec!(5), (2025, 6, 2))];

    let mut mock = flat_bom_mock(purchase.clone(), valuation.clone());
    // Second pass re-runs the same query sequence
    mock = mock
        .append_query_results([vec![bom(1, 100, dec!(1), (2025, 1))]])
        .append_query_results([vec![product(100, "P1", "Product One")]])
        .append_query_results([vec![
            line(1, 1, 101, dec!(2), 1),
            line(2, 1, 102, dec!(3), 2),
        ]])
        .append_query_results([
            Vec::<bom_header::Model>::new(),
            Vec::<bom_header::Model>::new(),
        ])
        .append_query_results([vec![
            product(101, "C1", "Component One"),
            product(102, "C2", "Component Two"),
        ]])
        .append_query_results([purchase])
        .append_query_results([valuation]);

    let service = CostAnalysisService::new(Arc::new(mock.into_connection()), 16);

    let first = service.analyze(1, 6).await.unwrap();
    let second = service.analyze(1, 6).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.total_cost, CostValue::Computed(dec!(35)));
}

#[tokio::test]
async fn cost_trend_reports_one_point_per_window_month() {
    // Single component C1 x2; priced 10 in May and 20 in June. Over a
    // 3-month window anchored at June: April has no data, May totals 20,
    // June totals 40.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![bom(1, 100, dec!(1), (2025, 1))]])
        .append_query_results([vec![product(100, "P1", "Product One")]])
        .append_query_results([vec![line(1, 1, 101, dec!(2), 1)]])
        .append_query_results([Vec::<bom_header::Model>::new()])
        .append_query_results([vec![product(101, "C1", "Component One")]])
        .append_query_results([vec![
            po(1, 101, dec!(10), (2025, 5, 10)),
            po(2, 101, dec!(20), (2025, 6, 10)),
        ]])
        .append_query_results([Vec::<stock_valuation_layer::Model>::new()])
        .into_connection();
    let service = CostAnalysisService::new(Arc::new(db), 16);

    let points = service.cost_trend(1, 3).await.unwrap();

    let periods: Vec<String> = points.iter().map(|p| p.period.to_string()).collect();
    assert_eq!(periods, vec!["2025-04", "2025-05", "2025-06"]);
    assert_eq!(points[0].total_cost, CostValue::Unavailable);
    assert_eq!(points[1].total_cost, CostValue::Computed(dec!(20)));
    assert_eq!(points[2].total_cost, CostValue::Computed(dec!(40)));
}
