use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::Currency;

#[derive(Deserialize)]
pub struct InboundRequest {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub currency: Option<Currency>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct OutboundRequest {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    /// Business reason, e.g. WASTE or SHIPMENT.
    pub reference_type: String,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct AdjustmentRequest {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    /// Signed: positive adds to availability, negative removes.
    pub quantity: Decimal,
    pub reason: String,
}

#[derive(Deserialize)]
pub struct MovementListQuery {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize)]
pub struct LevelsQuery {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub requested: Decimal,
    pub available: Decimal,
    pub sufficient: bool,
}
