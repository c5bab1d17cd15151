use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{Currency, MovementKind};

/// One entry of the append-only stock ledger. Rows are never updated or
/// deleted; the projection in `inventory_levels` is derived from them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Movement {
    pub movement_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub kind: MovementKind,
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
    pub currency: Option<Currency>,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Current stock projection for one (product, warehouse) pair.
/// A missing row is equivalent to all-zero quantities.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InventoryLevel {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub available_quantity: Decimal,
    pub reserved_quantity: Decimal,
    pub in_transit_quantity: Decimal,
    pub last_movement_at: Option<DateTime<Utc>>,
}
