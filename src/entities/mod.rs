pub mod bom_header;
pub mod bom_line;
pub mod product;
pub mod product_category;
pub mod purchase_order_line;
pub mod stock_valuation_layer;
