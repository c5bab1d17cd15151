use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::enums::ProductStatus;

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    pub selling_price: Decimal,
    pub cost_price: Decimal,
}

#[derive(Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub status: Option<ProductStatus>,
    pub selling_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
}

#[derive(Deserialize)]
pub struct ProductListQuery {
    pub status: Option<ProductStatus>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
