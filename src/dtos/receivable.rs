use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{Currency, PaymentMethod, ReceivableStatus};
use crate::models::receivable::{AccountsReceivable, CustomerPayment};

#[derive(Deserialize)]
pub struct RegisterPaymentRequest {
    pub amount: Decimal,
    pub currency: Currency,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct ReceivableListQuery {
    pub customer_id: Option<Uuid>,
    pub status: Option<ReceivableStatus>,
    pub due_before: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub receivable: AccountsReceivable,
    pub payment: CustomerPayment,
}

#[derive(Serialize)]
pub struct CustomerBalanceResponse {
    pub customer_id: Uuid,
    pub outstanding_balance: Decimal,
}
