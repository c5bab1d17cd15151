// src/services/reservation.rs
//
// Reservation lifecycle: PENDING -> CONFIRMED -> FULFILLED, with CANCELLED
// and EXPIRED as terminal exits. Reserved stock is held through RESERVE
// movements and given back through RESERVE_RELEASE, so the movement ledger
// stays the single source of truth for the projection.
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::enums::{
    Currency, MovementKind, PaymentMethod, ProductStatus, ReservationStatus, SaleStatus, SaleType,
};
use crate::models::product::Product;
use crate::models::reservation::{Reservation, ReservationItem};
use crate::models::sale::{Sale, SaleDetail};
use crate::services::ledger::{MovementLedger, NewMovement};
use crate::services::notifier::Notifier;
use crate::services::sale::{CreateSaleInput, SaleEngine, SaleLineInput};
use crate::services::sequence::{SequenceGenerator, SequenceScope};

#[derive(Debug, Clone)]
pub struct ReservationItemInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct CreateReservationInput {
    pub customer_id: Uuid,
    pub child_id: Option<Uuid>,
    pub list_id: Option<Uuid>,
    pub store_id: Uuid,
    pub expiration_days: i64,
    pub deposit_amount: Decimal,
    pub currency: Currency,
    pub notes: Option<String>,
    pub items: Vec<ReservationItemInput>,
}

#[derive(Debug, Clone)]
pub struct FulfillReservationInput {
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct ReservationEngine {
    pool: PgPool,
    ledger: MovementLedger,
    sequence: SequenceGenerator,
    sales: SaleEngine,
    notifier: Notifier,
}

impl ReservationEngine {
    pub fn new(
        pool: PgPool,
        ledger: MovementLedger,
        sequence: SequenceGenerator,
        sales: SaleEngine,
        notifier: Notifier,
    ) -> Self {
        Self {
            pool,
            ledger,
            sequence,
            sales,
            notifier,
        }
    }

    pub async fn create(
        &self,
        input: CreateReservationInput,
        created_by: Uuid,
    ) -> Result<(Reservation, Vec<ReservationItem>), AppError> {
        if input.items.is_empty() {
            return Err(AppError::validation(
                "Reservation must have at least one item",
            ));
        }
        if input.expiration_days <= 0 {
            return Err(AppError::validation("Expiration days must be positive"));
        }
        if input.deposit_amount < Decimal::ZERO {
            return Err(AppError::validation("Deposit cannot be negative"));
        }

        let mut tx = self.pool.begin().await?;

        let customer_exists: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM customers WHERE customer_id = $1")
                .bind(input.customer_id)
                .fetch_optional(&mut *tx)
                .await?;
        if customer_exists.is_none() {
            return Err(AppError::not_found(format!(
                "Customer with id {} not found",
                input.customer_id
            )));
        }

        if let Some(child_id) = input.child_id {
            let belongs: Option<i32> = sqlx::query_scalar(
                "SELECT 1 FROM customer_children WHERE child_id = $1 AND customer_id = $2",
            )
            .bind(child_id)
            .bind(input.customer_id)
            .fetch_optional(&mut *tx)
            .await?;
            if belongs.is_none() {
                return Err(AppError::validation(
                    "Child does not belong to this customer",
                ));
            }
        }

        let warehouse_id = warehouse_for_store(&mut tx, input.store_id).await?;

        // Price and check every item while holding its projection lock, then
        // write everything in one shot. Items are locked in product-id order
        // so two concurrent reservations sharing products can never lock
        // them in opposite order and deadlock.
        let mut sorted_items = input.items.clone();
        sorted_items.sort_by_key(|item| item.product_id);

        let mut priced: Vec<(ReservationItemInput, Decimal, Decimal)> =
            Vec::with_capacity(sorted_items.len());
        for item in &sorted_items {
            if item.quantity <= Decimal::ZERO {
                return Err(AppError::validation("Quantity must be positive"));
            }

            let product = sqlx::query_as::<_, Product>(
                "SELECT * FROM products WHERE product_id = $1",
            )
            .bind(item.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Product with id {} not found", item.product_id))
            })?;
            if product.status != ProductStatus::Active {
                return Err(AppError::validation(format!(
                    "Product {} is not active",
                    product.name
                )));
            }

            let level = self
                .ledger
                .lock_level(&mut tx, item.product_id, warehouse_id)
                .await?;
            if level.available_quantity < item.quantity {
                return Err(AppError::InsufficientStock {
                    product: product.name,
                    available: level.available_quantity,
                    requested: item.quantity,
                });
            }

            let unit_price = item.unit_price.unwrap_or(product.selling_price);
            if unit_price < Decimal::ZERO {
                return Err(AppError::validation("Unit price cannot be negative"));
            }
            let line_total = (item.quantity * unit_price).round_dp(2);
            priced.push((item.clone(), unit_price, line_total));
        }

        let total_amount: Decimal = priced.iter().map(|(_, _, t)| *t).sum();
        if input.deposit_amount > total_amount {
            return Err(AppError::validation(
                "Deposit cannot exceed the reservation total",
            ));
        }
        let balance = total_amount - input.deposit_amount;

        let reservation_number = self
            .sequence
            .next(&mut tx, SequenceScope::Reservation)
            .await?;
        let reservation_id = Uuid::new_v4();
        let expiration_date = Utc::now() + Duration::days(input.expiration_days);

        let reservation = sqlx::query_as::<_, Reservation>(
            r#"INSERT INTO reservations
               (reservation_id, reservation_number, customer_id, child_id, list_id, store_id,
                status, expiration_date, total_amount, deposit_amount, balance, currency,
                notes, created_by)
               VALUES ($1, $2, $3, $4, $5, $6, 'PENDING', $7, $8, $9, $10, $11, $12, $13)
               RETURNING *"#,
        )
        .bind(reservation_id)
        .bind(&reservation_number)
        .bind(input.customer_id)
        .bind(input.child_id)
        .bind(input.list_id)
        .bind(input.store_id)
        .bind(expiration_date)
        .bind(total_amount)
        .bind(input.deposit_amount)
        .bind(balance)
        .bind(input.currency)
        .bind(&input.notes)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(priced.len());
        for (item, unit_price, line_total) in &priced {
            let row = sqlx::query_as::<_, ReservationItem>(
                r#"INSERT INTO reservation_items
                   (reservation_item_id, reservation_id, product_id, quantity,
                    reserved_quantity, fulfilled_quantity, unit_price, total_amount,
                    is_fulfilled)
                   VALUES ($1, $2, $3, $4, $4, 0, $5, $6, FALSE)
                   RETURNING *"#,
            )
            .bind(Uuid::new_v4())
            .bind(reservation_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(unit_price)
            .bind(line_total)
            .fetch_one(&mut *tx)
            .await?;
            items.push(row);

            self.ledger
                .record(
                    &mut tx,
                    NewMovement {
                        product_id: item.product_id,
                        warehouse_id,
                        kind: MovementKind::Reserve,
                        quantity: item.quantity,
                        unit_cost: None,
                        currency: Some(input.currency),
                        reference_type: Some("RESERVATION".to_string()),
                        reference_id: Some(reservation_id),
                        notes: None,
                        created_by: Some(created_by),
                    },
                )
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            reservation_id = %reservation.reservation_id,
            reservation_number = %reservation.reservation_number,
            total = %reservation.total_amount,
            "Reservation created"
        );
        self.notifier
            .reservation_confirmation(reservation.reservation_id);

        Ok((reservation, items))
    }

    /// PENDING -> CONFIRMED. Stock was already held at creation, so this is
    /// a pure status transition.
    pub async fn confirm(&self, reservation_id: Uuid) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await?;

        let reservation = lock_reservation(&mut tx, reservation_id).await?;
        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::invalid_state(format!(
                "Can only confirm pending reservations, current status is {:?}",
                reservation.status
            )));
        }

        let reservation = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = 'CONFIRMED' WHERE reservation_id = $1 RETURNING *",
        )
        .bind(reservation_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(reservation_id = %reservation_id, "Reservation confirmed");

        Ok(reservation)
    }

    /// Converts a CONFIRMED reservation into a completed sale at the prices
    /// snapshotted on the reservation items.
    ///
    /// The release movements, the sale with its OUT movements, and the
    /// status flip all commit together. Each unit leaves the reserved bucket
    /// exactly once and the available bucket exactly once.
    pub async fn fulfill(
        &self,
        reservation_id: Uuid,
        input: FulfillReservationInput,
        fulfilled_by: Uuid,
    ) -> Result<(Reservation, Sale, Vec<SaleDetail>), AppError> {
        let mut tx = self.pool.begin().await?;

        let reservation = lock_reservation(&mut tx, reservation_id).await?;
        if reservation.status != ReservationStatus::Confirmed {
            return Err(AppError::invalid_state(format!(
                "Can only fulfill confirmed reservations, current status is {:?}",
                reservation.status
            )));
        }

        let items = fetch_items(&mut tx, reservation_id).await?;
        let warehouse_id = warehouse_for_store(&mut tx, reservation.store_id).await?;

        // Give the held units back to the available bucket first; the sale's
        // OUT movements then consume them inside this same transaction.
        for item in &items {
            if item.reserved_quantity <= Decimal::ZERO {
                continue;
            }
            self.ledger
                .record(
                    &mut tx,
                    NewMovement {
                        product_id: item.product_id,
                        warehouse_id,
                        kind: MovementKind::ReserveRelease,
                        quantity: item.reserved_quantity,
                        unit_cost: None,
                        currency: Some(reservation.currency),
                        reference_type: Some("RESERVATION_FULFILLMENT".to_string()),
                        reference_id: Some(reservation_id),
                        notes: None,
                        created_by: Some(fulfilled_by),
                    },
                )
                .await?;
        }

        let sale_input = CreateSaleInput {
            customer_id: Some(reservation.customer_id),
            store_id: reservation.store_id,
            warehouse_id,
            sale_type: SaleType::Reservation,
            status: SaleStatus::Completed,
            currency: reservation.currency,
            exchange_rate: None,
            payment_method: input.payment_method,
            payment_reference: input.payment_reference,
            reservation_id: Some(reservation_id),
            notes: input.notes.or_else(|| {
                Some(format!(
                    "Fulfillment of reservation {}",
                    reservation.reservation_number
                ))
            }),
            items: items
                .iter()
                .map(|item| SaleLineInput {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: Some(item.unit_price),
                    discount_amount: Decimal::ZERO,
                    tax_percentage: Decimal::ZERO,
                })
                .collect(),
        };
        let (sale, details) = self
            .sales
            .create_in_tx(&mut tx, sale_input, fulfilled_by)
            .await?;

        sqlx::query(
            r#"UPDATE reservation_items
               SET reserved_quantity = 0, fulfilled_quantity = quantity, is_fulfilled = TRUE
               WHERE reservation_id = $1"#,
        )
        .bind(reservation_id)
        .execute(&mut *tx)
        .await?;

        let reservation = sqlx::query_as::<_, Reservation>(
            r#"UPDATE reservations
               SET status = 'FULFILLED', fulfilled_at = now(), fulfilled_by = $2,
                   pickup_date = now()
               WHERE reservation_id = $1
               RETURNING *"#,
        )
        .bind(reservation_id)
        .bind(fulfilled_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            reservation_id = %reservation_id,
            sale_id = %sale.sale_id,
            invoice_number = %sale.invoice_number,
            "Reservation fulfilled"
        );

        Ok((reservation, sale, details))
    }

    pub async fn cancel(
        &self,
        reservation_id: Uuid,
        reason: Option<String>,
        cancelled_by: Option<Uuid>,
    ) -> Result<Reservation, AppError> {
        self.release_and_close(
            reservation_id,
            ReservationStatus::Cancelled,
            reason,
            cancelled_by,
        )
        .await
    }

    /// Cancels every reservation whose expiration date has passed, one
    /// transaction each so a failure does not hold the rest back. Returns
    /// the number actually expired.
    pub async fn expire_sweep(&self) -> Result<u64, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"SELECT reservation_id FROM reservations
               WHERE status IN ('PENDING', 'CONFIRMED') AND expiration_date < now()
               ORDER BY expiration_date"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut expired = 0u64;
        for id in ids {
            match self
                .release_and_close(id, ReservationStatus::Expired, None, None)
                .await
            {
                Ok(_) => expired += 1,
                Err(e) => {
                    tracing::warn!(reservation_id = %id, error = %e, "Failed to expire reservation");
                }
            }
        }

        if expired > 0 {
            tracing::info!(count = expired, "Expired overdue reservations");
        }
        Ok(expired)
    }

    /// Queues a pickup reminder for reservations expiring within
    /// `hours_before` hours. A reservation is reminded at most once per day.
    pub async fn send_reminders(&self, hours_before: i64) -> Result<u64, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"SELECT reservation_id FROM reservations
               WHERE status IN ('PENDING', 'CONFIRMED')
                 AND expiration_date > now()
                 AND expiration_date <= now() + $1 * interval '1 hour'
                 AND (reminder_sent_at IS NULL OR reminder_sent_at < now() - interval '24 hours')
               ORDER BY expiration_date"#,
        )
        .bind(hours_before)
        .fetch_all(&self.pool)
        .await?;

        let mut sent = 0u64;
        for id in ids {
            let result = sqlx::query(
                "UPDATE reservations SET reminder_sent_at = now() WHERE reservation_id = $1",
            )
            .bind(id)
            .execute(&self.pool)
            .await;
            match result {
                Ok(_) => {
                    self.notifier.reservation_reminder(id);
                    sent += 1;
                }
                Err(e) => {
                    tracing::warn!(reservation_id = %id, error = %e, "Failed to stamp reminder");
                }
            }
        }

        Ok(sent)
    }

    pub async fn get(
        &self,
        reservation_id: Uuid,
    ) -> Result<(Reservation, Vec<ReservationItem>), AppError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE reservation_id = $1",
        )
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!("Reservation with id {reservation_id} not found"))
        })?;

        let items = sqlx::query_as::<_, ReservationItem>(
            "SELECT * FROM reservation_items WHERE reservation_id = $1 ORDER BY created_at, reservation_item_id",
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok((reservation, items))
    }

    pub async fn get_by_number(
        &self,
        reservation_number: &str,
    ) -> Result<(Reservation, Vec<ReservationItem>), AppError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE reservation_number = $1",
        )
        .bind(reservation_number)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Reservation not found"))?;

        let items = sqlx::query_as::<_, ReservationItem>(
            "SELECT * FROM reservation_items WHERE reservation_id = $1 ORDER BY created_at, reservation_item_id",
        )
        .bind(reservation.reservation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok((reservation, items))
    }

    pub async fn list(
        &self,
        customer_id: Option<Uuid>,
        store_id: Option<Uuid>,
        status: Option<ReservationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Reservation>, i64), AppError> {
        const FILTER: &str = "($1::uuid IS NULL OR customer_id = $1)
               AND ($2::uuid IS NULL OR store_id = $2)
               AND ($3::reservation_status IS NULL OR status = $3)";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT count(*) FROM reservations WHERE {FILTER}"))
                .bind(customer_id)
                .bind(store_id)
                .bind(status)
                .fetch_one(&self.pool)
                .await?;

        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT * FROM reservations WHERE {FILTER}
             ORDER BY reservation_date DESC, reservation_id DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(customer_id)
        .bind(store_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((reservations, total))
    }

    async fn release_and_close(
        &self,
        reservation_id: Uuid,
        target: ReservationStatus,
        reason: Option<String>,
        closed_by: Option<Uuid>,
    ) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await?;

        let reservation = lock_reservation(&mut tx, reservation_id).await?;
        if !matches!(
            reservation.status,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        ) {
            return Err(AppError::invalid_state(format!(
                "Can only cancel pending or confirmed reservations, current status is {:?}",
                reservation.status
            )));
        }

        let items = fetch_items(&mut tx, reservation_id).await?;
        let warehouse_id = warehouse_for_store(&mut tx, reservation.store_id).await?;

        let reference_type = match target {
            ReservationStatus::Expired => "RESERVATION_EXPIRATION",
            _ => "RESERVATION_CANCELLATION",
        };
        for item in &items {
            if item.reserved_quantity <= Decimal::ZERO {
                continue;
            }
            self.ledger
                .record(
                    &mut tx,
                    NewMovement {
                        product_id: item.product_id,
                        warehouse_id,
                        kind: MovementKind::ReserveRelease,
                        quantity: item.reserved_quantity,
                        unit_cost: None,
                        currency: Some(reservation.currency),
                        reference_type: Some(reference_type.to_string()),
                        reference_id: Some(reservation_id),
                        notes: reason.clone(),
                        created_by: closed_by,
                    },
                )
                .await?;
        }

        sqlx::query("UPDATE reservation_items SET reserved_quantity = 0 WHERE reservation_id = $1")
            .bind(reservation_id)
            .execute(&mut *tx)
            .await?;

        let reservation = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = $2 WHERE reservation_id = $1 RETURNING *",
        )
        .bind(reservation_id)
        .bind(target)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            reservation_id = %reservation_id,
            status = ?reservation.status,
            "Reservation closed"
        );

        Ok(reservation)
    }
}

async fn lock_reservation(
    tx: &mut Transaction<'_, Postgres>,
    reservation_id: Uuid,
) -> Result<Reservation, AppError> {
    sqlx::query_as::<_, Reservation>(
        "SELECT * FROM reservations WHERE reservation_id = $1 FOR UPDATE",
    )
    .bind(reservation_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Reservation with id {reservation_id} not found")))
}

async fn fetch_items(
    tx: &mut Transaction<'_, Postgres>,
    reservation_id: Uuid,
) -> Result<Vec<ReservationItem>, AppError> {
    let items = sqlx::query_as::<_, ReservationItem>(
        "SELECT * FROM reservation_items WHERE reservation_id = $1 ORDER BY created_at, reservation_item_id",
    )
    .bind(reservation_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(items)
}

/// Reservations are taken against the store's stock; the store's first
/// warehouse is where the hold lives.
async fn warehouse_for_store(
    tx: &mut Transaction<'_, Postgres>,
    store_id: Uuid,
) -> Result<Uuid, AppError> {
    sqlx::query_scalar(
        "SELECT warehouse_id FROM warehouses WHERE store_id = $1 ORDER BY created_at LIMIT 1",
    )
    .bind(store_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::validation("Store has no warehouse to reserve stock from"))
}
