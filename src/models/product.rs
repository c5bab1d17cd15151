use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::ProductStatus;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub status: ProductStatus,
    pub selling_price: Decimal,
    pub cost_price: Decimal,
    pub created_at: DateTime<Utc>,
}
