use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Product Cost Analysis API",
        description = r#"
Read-only analytical API over a manufacturing schema: drill down the product
category hierarchy, pick a product and one of its BOM versions, and get a
recursive cost breakdown averaged over a trailing 3, 6 or 12 month window of
purchase and valuation history.

Costs are reported in the single currency of the source data. Components
without price evidence in the window are reported as unavailable rather than
zero, and unavailability propagates to every ancestor total.
"#
    ),
    paths(
        crate::handlers::categories::resolve_categories,
        crate::handlers::products::list_products,
        crate::handlers::products::list_boms,
        crate::handlers::cost_analysis::cost_analysis,
        crate::handlers::cost_analysis::cost_trend,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::handlers::categories::CategoryDto,
        crate::handlers::categories::CategoryResolutionResponse,
        crate::handlers::products::ProductDto,
        crate::handlers::products::BomDto,
        crate::handlers::products::BomListResponse,
        crate::costing::DisplayRow,
        crate::costing::CostStatus,
        crate::costing::PriceSource,
        crate::services::costing::CostReport,
        crate::services::costing::CostTrendPoint,
    )),
    tags(
        (name = "categories", description = "Category hierarchy drill-down"),
        (name = "products", description = "Product and BOM lookup"),
        (name = "cost-analysis", description = "Windowed BOM cost roll-up")
    )
)]
pub struct ApiDoc;
