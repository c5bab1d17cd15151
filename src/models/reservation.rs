use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{Currency, ReservationStatus};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reservation {
    pub reservation_id: Uuid,
    pub reservation_number: String,
    pub customer_id: Uuid,
    pub child_id: Option<Uuid>,
    pub list_id: Option<Uuid>,
    pub store_id: Uuid,
    pub status: ReservationStatus,
    pub reservation_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    pub pickup_date: Option<DateTime<Utc>>,
    pub total_amount: Decimal,
    pub deposit_amount: Decimal,
    pub balance: Decimal,
    pub currency: Currency,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub fulfilled_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Reservation line item; the unit price is snapshotted at creation time so
/// fulfillment never re-prices against the current product price.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReservationItem {
    pub reservation_item_id: Uuid,
    pub reservation_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub reserved_quantity: Decimal,
    pub fulfilled_quantity: Decimal,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub is_fulfilled: bool,
    pub created_at: DateTime<Utc>,
}
