use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{Currency, PaymentMethod, ReservationStatus};
use crate::models::reservation::{Reservation, ReservationItem};
use crate::models::sale::{Sale, SaleDetail};

#[derive(Deserialize)]
pub struct ReservationItemRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
}

#[derive(Deserialize)]
pub struct CreateReservationRequest {
    pub customer_id: Uuid,
    pub child_id: Option<Uuid>,
    pub list_id: Option<Uuid>,
    pub store_id: Uuid,
    #[serde(default = "default_expiration_days")]
    pub expiration_days: i64,
    #[serde(default)]
    pub deposit_amount: Decimal,
    pub currency: Currency,
    pub notes: Option<String>,
    pub items: Vec<ReservationItemRequest>,
}

fn default_expiration_days() -> i64 {
    30
}

#[derive(Deserialize)]
pub struct FulfillReservationRequest {
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelReservationRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ReservationListQuery {
    pub customer_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub status: Option<ReservationStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize)]
pub struct ReminderRequest {
    #[serde(default = "default_reminder_hours")]
    pub hours_before: i64,
}

fn default_reminder_hours() -> i64 {
    48
}

#[derive(Serialize)]
pub struct ReservationResponse {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub items: Vec<ReservationItem>,
}

#[derive(Serialize)]
pub struct FulfillmentResponse {
    pub reservation: Reservation,
    pub sale: Sale,
    pub sale_items: Vec<SaleDetail>,
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub processed: u64,
}
