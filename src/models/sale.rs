use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{Currency, PaymentMethod, SaleStatus, SaleType};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Sale {
    pub sale_id: Uuid,
    pub invoice_number: String,
    pub customer_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub sale_date: DateTime<Utc>,
    pub sale_type: SaleType,
    pub status: SaleStatus,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub currency: Currency,
    pub exchange_rate: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub reservation_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A sale line item. Immutable once the sale exists; corrections happen by
/// cancelling the sale and creating a new one.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SaleDetail {
    pub detail_id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
    pub subtotal: Decimal,
    pub tax_percentage: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}
