// src/services/ledger.rs
//
// Movement ledger: the append-only record of stock changes and the
// projection derived from it. Every business event that touches stock goes
// through `record`, inside the transaction that created the event, so the
// ledger row and the projection update commit or roll back together.
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::enums::{Currency, MovementKind};
use crate::models::movement::{InventoryLevel, Movement};

#[derive(Debug, Clone)]
pub struct NewMovement {
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
}

/// Per-kind deltas applied to the projection row, as
/// (available, reserved, in_transit).
///
/// RESERVE moves quantity from available to reserved without changing the
/// net position; RESERVE_RELEASE is its inverse. TRANSFER only touches the
/// in-transit bucket. ADJUSTMENT quantities are signed.
pub fn projection_deltas(kind: MovementKind, quantity: Decimal) -> (Decimal, Decimal, Decimal) {
    match kind {
        MovementKind::In => (quantity, Decimal::ZERO, Decimal::ZERO),
        MovementKind::Out => (-quantity, Decimal::ZERO, Decimal::ZERO),
        MovementKind::Adjustment => (quantity, Decimal::ZERO, Decimal::ZERO),
        MovementKind::Transfer => (Decimal::ZERO, Decimal::ZERO, quantity),
        MovementKind::Reserve => (-quantity, quantity, Decimal::ZERO),
        MovementKind::ReserveRelease => (quantity, -quantity, Decimal::ZERO),
    }
}

#[derive(Clone)]
pub struct MovementLedger {
    pool: PgPool,
}

impl MovementLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends one movement and updates the projection for its
    /// (product, warehouse) pair, inside the caller's transaction.
    ///
    /// Fails with `NotFound` if the product or warehouse does not exist.
    /// It never rejects an under-stocked OUT/RESERVE itself: callers must
    /// pre-check availability (under the row lock from `lock_level`)
    /// before issuing those kinds.
    pub async fn record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        new: NewMovement,
    ) -> Result<Movement, AppError> {
        let product: Option<i32> = sqlx::query_scalar("SELECT 1 FROM products WHERE product_id = $1")
            .bind(new.product_id)
            .fetch_optional(&mut **tx)
            .await?;
        if product.is_none() {
            return Err(AppError::not_found(format!(
                "Product with id {} not found",
                new.product_id
            )));
        }

        let warehouse: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM warehouses WHERE warehouse_id = $1")
                .bind(new.warehouse_id)
                .fetch_optional(&mut **tx)
                .await?;
        if warehouse.is_none() {
            return Err(AppError::not_found(format!(
                "Warehouse with id {} not found",
                new.warehouse_id
            )));
        }

        let movement = sqlx::query_as::<_, Movement>(
            r#"INSERT INTO inventory_movements
               (movement_id, product_id, warehouse_id, kind, quantity, unit_cost,
                currency, reference_type, reference_id, notes, created_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(new.product_id)
        .bind(new.warehouse_id)
        .bind(new.kind)
        .bind(new.quantity)
        .bind(new.unit_cost)
        .bind(new.currency)
        .bind(&new.reference_type)
        .bind(new.reference_id)
        .bind(&new.notes)
        .bind(new.created_by)
        .fetch_one(&mut **tx)
        .await?;

        let (d_available, d_reserved, d_in_transit) = projection_deltas(new.kind, new.quantity);

        sqlx::query(
            r#"INSERT INTO inventory_levels
               (product_id, warehouse_id, available_quantity, reserved_quantity,
                in_transit_quantity, last_movement_at)
               VALUES ($1, $2, $3, $4, $5, now())
               ON CONFLICT (product_id, warehouse_id) DO UPDATE SET
                   available_quantity  = inventory_levels.available_quantity  + EXCLUDED.available_quantity,
                   reserved_quantity   = inventory_levels.reserved_quantity   + EXCLUDED.reserved_quantity,
                   in_transit_quantity = inventory_levels.in_transit_quantity + EXCLUDED.in_transit_quantity,
                   last_movement_at    = now()"#,
        )
        .bind(new.product_id)
        .bind(new.warehouse_id)
        .bind(d_available)
        .bind(d_reserved)
        .bind(d_in_transit)
        .execute(&mut **tx)
        .await?;

        Ok(movement)
    }

    /// Current projection for a pair; a never-moved pair reads as all zero.
    pub async fn projection_for(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<InventoryLevel, AppError> {
        let level = sqlx::query_as::<_, InventoryLevel>(
            "SELECT * FROM inventory_levels WHERE product_id = $1 AND warehouse_id = $2",
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(level.unwrap_or_else(|| zero_level(product_id, warehouse_id)))
    }

    pub async fn levels_for_warehouse(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<InventoryLevel>, AppError> {
        let levels = sqlx::query_as::<_, InventoryLevel>(
            "SELECT * FROM inventory_levels WHERE warehouse_id = $1 ORDER BY product_id",
        )
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(levels)
    }

    pub async fn levels_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<InventoryLevel>, AppError> {
        let levels = sqlx::query_as::<_, InventoryLevel>(
            "SELECT * FROM inventory_levels WHERE product_id = $1 ORDER BY warehouse_id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(levels)
    }

    /// True iff available >= quantity. A missing projection row means zero
    /// availability, never an error.
    pub async fn check_availability(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: Decimal,
    ) -> Result<bool, AppError> {
        let available: Option<Decimal> = sqlx::query_scalar(
            "SELECT available_quantity FROM inventory_levels
             WHERE product_id = $1 AND warehouse_id = $2",
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(available.unwrap_or(Decimal::ZERO) >= quantity)
    }

    /// Locks the projection row for the rest of the transaction and returns
    /// it. Serializes concurrent availability checks on the same pair so two
    /// sales cannot both pass against a stale row and jointly oversell.
    pub async fn lock_level(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<InventoryLevel, AppError> {
        let level = sqlx::query_as::<_, InventoryLevel>(
            "SELECT * FROM inventory_levels
             WHERE product_id = $1 AND warehouse_id = $2
             FOR UPDATE",
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(level.unwrap_or_else(|| zero_level(product_id, warehouse_id)))
    }

    /// Movement history, newest first, optionally filtered by product
    /// and/or warehouse. Returns the page plus the total row count.
    pub async fn list_movements(
        &self,
        product_id: Option<Uuid>,
        warehouse_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Movement>, i64), AppError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM inventory_movements
             WHERE ($1::uuid IS NULL OR product_id = $1)
               AND ($2::uuid IS NULL OR warehouse_id = $2)",
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_one(&self.pool)
        .await?;

        let movements = sqlx::query_as::<_, Movement>(
            "SELECT * FROM inventory_movements
             WHERE ($1::uuid IS NULL OR product_id = $1)
               AND ($2::uuid IS NULL OR warehouse_id = $2)
             ORDER BY created_at DESC, movement_id DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((movements, total))
    }

    /// Records a purchase/receiving entry (kind IN).
    pub async fn register_inbound(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: Decimal,
        unit_cost: Decimal,
        currency: Currency,
        notes: Option<String>,
        created_by: Uuid,
    ) -> Result<Movement, AppError> {
        if quantity <= Decimal::ZERO {
            return Err(AppError::validation("Quantity must be positive"));
        }
        if unit_cost <= Decimal::ZERO {
            return Err(AppError::validation("Unit cost must be positive"));
        }

        let mut tx = self.pool.begin().await?;
        let movement = self
            .record(
                &mut tx,
                NewMovement {
                    product_id,
                    warehouse_id,
                    kind: MovementKind::In,
                    quantity,
                    unit_cost: Some(unit_cost),
                    currency: Some(currency),
                    reference_type: Some("PURCHASE".to_string()),
                    reference_id: None,
                    notes,
                    created_by: Some(created_by),
                },
            )
            .await?;
        tx.commit().await?;
        Ok(movement)
    }

    /// Records a manual OUT (waste, breakage, internal shipment) after an
    /// availability pre-check under the projection row lock. Costed at the
    /// product's cost price since no sale carries the price.
    #[allow(clippy::too_many_arguments)]
    pub async fn register_outbound(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: Decimal,
        reference_type: String,
        reference_id: Option<Uuid>,
        notes: Option<String>,
        created_by: Uuid,
    ) -> Result<Movement, AppError> {
        if quantity <= Decimal::ZERO {
            return Err(AppError::validation("Quantity must be positive"));
        }

        let mut tx = self.pool.begin().await?;

        let (product_name, cost_price) = ensure_pair(&mut tx, product_id, warehouse_id).await?;
        let level = self.lock_level(&mut tx, product_id, warehouse_id).await?;
        if level.available_quantity < quantity {
            return Err(AppError::InsufficientStock {
                product: product_name,
                available: level.available_quantity,
                requested: quantity,
            });
        }

        let movement = self
            .record(
                &mut tx,
                NewMovement {
                    product_id,
                    warehouse_id,
                    kind: MovementKind::Out,
                    quantity,
                    unit_cost: Some(cost_price),
                    currency: Some(Currency::Ves),
                    reference_type: Some(reference_type),
                    reference_id,
                    notes,
                    created_by: Some(created_by),
                },
            )
            .await?;
        tx.commit().await?;
        Ok(movement)
    }

    /// Records a manual correction (kind ADJUSTMENT, signed quantity).
    /// A decrease may not exceed current availability.
    pub async fn register_adjustment(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: Decimal,
        notes: Option<String>,
        created_by: Uuid,
    ) -> Result<Movement, AppError> {
        if quantity == Decimal::ZERO {
            return Err(AppError::validation(
                "Adjustment quantity cannot be 0. Use positive to increase, negative to decrease",
            ));
        }

        let mut tx = self.pool.begin().await?;

        if quantity < Decimal::ZERO {
            // Existence first, so an unknown pair is NOT_FOUND rather than
            // a zero-availability stock error.
            let (product_name, _) = ensure_pair(&mut tx, product_id, warehouse_id).await?;
            let level = self.lock_level(&mut tx, product_id, warehouse_id).await?;
            if -quantity > level.available_quantity {
                return Err(AppError::InsufficientStock {
                    product: product_name,
                    available: level.available_quantity,
                    requested: -quantity,
                });
            }
        }

        let movement = self
            .record(
                &mut tx,
                NewMovement {
                    product_id,
                    warehouse_id,
                    kind: MovementKind::Adjustment,
                    quantity,
                    unit_cost: None,
                    currency: None,
                    reference_type: Some("ADJUSTMENT".to_string()),
                    reference_id: None,
                    notes,
                    created_by: Some(created_by),
                },
            )
            .await?;
        tx.commit().await?;
        Ok(movement)
    }
}

/// Verifies the pair exists before any availability comparison and returns
/// the product's name and cost price.
async fn ensure_pair(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    warehouse_id: Uuid,
) -> Result<(String, Decimal), AppError> {
    let product: Option<(String, Decimal)> =
        sqlx::query_as("SELECT name, cost_price FROM products WHERE product_id = $1")
            .bind(product_id)
            .fetch_optional(&mut **tx)
            .await?;
    let product = product.ok_or_else(|| {
        AppError::not_found(format!("Product with id {product_id} not found"))
    })?;

    let warehouse: Option<i32> =
        sqlx::query_scalar("SELECT 1 FROM warehouses WHERE warehouse_id = $1")
            .bind(warehouse_id)
            .fetch_optional(&mut **tx)
            .await?;
    if warehouse.is_none() {
        return Err(AppError::not_found(format!(
            "Warehouse with id {warehouse_id} not found"
        )));
    }

    Ok(product)
}

fn zero_level(product_id: Uuid, warehouse_id: Uuid) -> InventoryLevel {
    InventoryLevel {
        product_id,
        warehouse_id,
        available_quantity: Decimal::ZERO,
        reserved_quantity: Decimal::ZERO,
        in_transit_quantity: Decimal::ZERO,
        last_movement_at: None,
    }
}
