use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{Currency, PaymentMethod, SaleStatus, SaleType};
use crate::models::receivable::AccountsReceivable;
use crate::models::sale::{Sale, SaleDetail};

#[derive(Deserialize)]
pub struct SaleItemRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
    /// Defaults to the product's selling price when omitted.
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub tax_percentage: Decimal,
}

#[derive(Deserialize)]
pub struct CreateSaleRequest {
    pub customer_id: Option<Uuid>,
    pub store_id: Uuid,
    pub warehouse_id: Uuid,
    #[serde(default = "default_sale_type")]
    pub sale_type: SaleType,
    #[serde(default = "default_sale_status")]
    pub status: SaleStatus,
    pub currency: Currency,
    pub exchange_rate: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<SaleItemRequest>,
}

fn default_sale_type() -> SaleType {
    SaleType::Cash
}

fn default_sale_status() -> SaleStatus {
    SaleStatus::Completed
}

#[derive(Deserialize)]
pub struct CreateCreditSaleRequest {
    #[serde(flatten)]
    pub sale: CreateSaleRequest,
    pub credit_days: i64,
}

#[derive(Deserialize)]
pub struct CancelSaleRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct SaleListQuery {
    pub customer_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub sale_type: Option<SaleType>,
    pub status: Option<SaleStatus>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Serialize)]
pub struct SaleResponse {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleDetail>,
}

#[derive(Serialize)]
pub struct CreditSaleResponse {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleDetail>,
    pub receivable: AccountsReceivable,
}
