use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{Currency, PaymentMethod, ReceivableStatus};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccountsReceivable {
    pub receivable_id: Uuid,
    pub sale_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub balance: Decimal,
    pub currency: Currency,
    pub due_date: DateTime<Utc>,
    pub status: ReceivableStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payment applied against a receivable. Immutable once created.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CustomerPayment {
    pub payment_id: Uuid,
    pub receivable_id: Uuid,
    pub amount: Decimal,
    pub currency: Currency,
    pub payment_method: PaymentMethod,
    pub payment_date: DateTime<Utc>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
