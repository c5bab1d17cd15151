// src/services/sale.rs
//
// Sale transaction engine. A sale, its line items, and the OUT movements it
// triggers are one atomic unit; nothing is persisted when any line fails
// validation or the availability check.
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::enums::{Currency, PaymentMethod, ProductStatus, SaleStatus, SaleType};
use crate::models::product::Product;
use crate::models::receivable::AccountsReceivable;
use crate::models::sale::{Sale, SaleDetail};
use crate::services::ledger::{MovementLedger, NewMovement};
use crate::services::sequence::{SequenceGenerator, SequenceScope};

#[derive(Debug, Clone)]
pub struct SaleLineInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    /// Explicit price override; defaults to the product's selling price.
    pub unit_price: Option<Decimal>,
    pub discount_amount: Decimal,
    pub tax_percentage: Decimal,
}

#[derive(Debug, Clone)]
pub struct CreateSaleInput {
    pub customer_id: Option<Uuid>,
    pub store_id: Uuid,
    pub warehouse_id: Uuid,
    pub sale_type: SaleType,
    pub status: SaleStatus,
    pub currency: Currency,
    pub exchange_rate: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub reservation_id: Option<Uuid>,
    pub notes: Option<String>,
    pub items: Vec<SaleLineInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Line math, rounded to the currency's two-place granularity:
/// subtotal = quantity x unit price - discount, tax on the subtotal,
/// total = subtotal + tax.
pub fn compute_line(
    quantity: Decimal,
    unit_price: Decimal,
    discount_amount: Decimal,
    tax_percentage: Decimal,
) -> LineAmounts {
    let subtotal = (quantity * unit_price - discount_amount).round_dp(2);
    let tax_amount = (subtotal * tax_percentage / Decimal::from(100)).round_dp(2);
    LineAmounts {
        subtotal,
        tax_amount,
        total: subtotal + tax_amount,
    }
}

#[derive(Clone)]
pub struct SaleEngine {
    pool: PgPool,
    ledger: MovementLedger,
    sequence: SequenceGenerator,
}

impl SaleEngine {
    pub fn new(pool: PgPool, ledger: MovementLedger, sequence: SequenceGenerator) -> Self {
        Self {
            pool,
            ledger,
            sequence,
        }
    }

    pub async fn create(
        &self,
        input: CreateSaleInput,
        created_by: Uuid,
    ) -> Result<(Sale, Vec<SaleDetail>), AppError> {
        let mut tx = self.pool.begin().await?;
        let (sale, details) = self.create_in_tx(&mut tx, input, created_by).await?;
        tx.commit().await?;

        tracing::info!(
            sale_id = %sale.sale_id,
            invoice_number = %sale.invoice_number,
            total = %sale.total_amount,
            "Sale created"
        );

        Ok((sale, details))
    }

    /// Runs the full sale flow inside an already-open transaction, so a
    /// caller can bundle the sale with its own writes (reservation
    /// fulfillment does this).
    pub(crate) async fn create_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: CreateSaleInput,
        created_by: Uuid,
    ) -> Result<(Sale, Vec<SaleDetail>), AppError> {
        if input.items.is_empty() {
            return Err(AppError::validation("Sale must have at least one item"));
        }
        if !matches!(input.status, SaleStatus::Completed | SaleStatus::Draft) {
            return Err(AppError::validation(
                "Sales can only be created as COMPLETED or DRAFT",
            ));
        }

        if let Some(customer_id) = input.customer_id {
            ensure_customer_exists(tx, customer_id).await?;
        }
        ensure_warehouse_exists(tx, input.warehouse_id).await?;

        // Validate every line and snapshot its pricing before writing
        // anything. The projection row lock makes the availability check
        // reliable for the rest of the transaction. Lines are locked in
        // product-id order so two concurrent sales sharing products can
        // never lock them in opposite order and deadlock.
        let mut items = input.items.clone();
        items.sort_by_key(|item| item.product_id);

        let mut lines: Vec<(SaleLineInput, Decimal, LineAmounts)> =
            Vec::with_capacity(items.len());

        for item in &items {
            if item.quantity <= Decimal::ZERO {
                return Err(AppError::validation("Quantity must be positive"));
            }

            let product = fetch_product(tx, item.product_id).await?;
            if product.status != ProductStatus::Active {
                return Err(AppError::validation(format!(
                    "Product {} is not active",
                    product.name
                )));
            }

            let level = self
                .ledger
                .lock_level(&mut *tx, item.product_id, input.warehouse_id)
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

            let amounts = compute_line(
                item.quantity,
                unit_price,
                item.discount_amount,
                item.tax_percentage,
            );
            lines.push((item.clone(), unit_price, amounts));
        }

        let subtotal: Decimal = lines.iter().map(|(_, _, a)| a.subtotal).sum();
        let tax_amount: Decimal = lines.iter().map(|(_, _, a)| a.tax_amount).sum();
        let total_amount: Decimal = lines.iter().map(|(_, _, a)| a.total).sum();
        let discount_amount: Decimal = input.items.iter().map(|i| i.discount_amount).sum();

        let invoice_number = self.sequence.next(&mut *tx, SequenceScope::Invoice).await?;
        let sale_id = Uuid::new_v4();

        let sale = sqlx::query_as::<_, Sale>(
            r#"INSERT INTO sales
               (sale_id, invoice_number, customer_id, store_id, warehouse_id, sale_type,
                status, subtotal, discount_amount, tax_amount, total_amount, currency,
                exchange_rate, payment_method, payment_reference, reservation_id, notes,
                created_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
               RETURNING *"#,
        )
        .bind(sale_id)
        .bind(&invoice_number)
        .bind(input.customer_id)
        .bind(input.store_id)
        .bind(input.warehouse_id)
        .bind(input.sale_type)
        .bind(input.status)
        .bind(subtotal)
        .bind(discount_amount)
        .bind(tax_amount)
        .bind(total_amount)
        .bind(input.currency)
        .bind(input.exchange_rate)
        .bind(input.payment_method)
        .bind(&input.payment_reference)
        .bind(input.reservation_id)
        .bind(&input.notes)
        .bind(created_by)
        .fetch_one(&mut **tx)
        .await?;

        let mut details = Vec::with_capacity(lines.len());
        for (item, unit_price, amounts) in &lines {
            let detail = sqlx::query_as::<_, SaleDetail>(
                r#"INSERT INTO sale_details
                   (detail_id, sale_id, product_id, quantity, unit_price, discount_amount,
                    subtotal, tax_percentage, tax_amount, total)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                   RETURNING *"#,
            )
            .bind(Uuid::new_v4())
            .bind(sale_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(unit_price)
            .bind(item.discount_amount)
            .bind(amounts.subtotal)
            .bind(item.tax_percentage)
            .bind(amounts.tax_amount)
            .bind(amounts.total)
            .fetch_one(&mut **tx)
            .await?;
            details.push(detail);
        }

        // Completed sales pull stock immediately; drafts do not move stock
        // until they are finalized.
        if sale.status == SaleStatus::Completed {
            for (item, unit_price, _) in &lines {
                self.ledger
                    .record(
                        &mut *tx,
                        NewMovement {
                            product_id: item.product_id,
                            warehouse_id: input.warehouse_id,
                            kind: crate::models::enums::MovementKind::Out,
                            quantity: item.quantity,
                            unit_cost: Some(*unit_price),
                            currency: Some(input.currency),
                            reference_type: Some("SALE".to_string()),
                            reference_id: Some(sale_id),
                            notes: None,
                            created_by: Some(created_by),
                        },
                    )
                    .await?;
            }
        }

        Ok((sale, details))
    }

    /// Cancels a COMPLETED sale and reverses its stock with one IN movement
    /// per original line. Cancellation is terminal and never partial.
    pub async fn cancel(
        &self,
        sale_id: Uuid,
        reason: Option<String>,
        cancelled_by: Uuid,
    ) -> Result<(Sale, Vec<SaleDetail>), AppError> {
        let mut tx = self.pool.begin().await?;

        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE sale_id = $1 FOR UPDATE")
            .bind(sale_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Sale with id {sale_id} not found")))?;

        if sale.status != SaleStatus::Completed {
            return Err(AppError::invalid_state(format!(
                "Can only cancel completed sales, current status is {:?}",
                sale.status
            )));
        }

        let sale = sqlx::query_as::<_, Sale>(
            "UPDATE sales SET status = 'CANCELLED' WHERE sale_id = $1 RETURNING *",
        )
        .bind(sale_id)
        .fetch_one(&mut *tx)
        .await?;

        let details = sqlx::query_as::<_, SaleDetail>(
            "SELECT * FROM sale_details WHERE sale_id = $1 ORDER BY created_at, detail_id",
        )
        .bind(sale_id)
        .fetch_all(&mut *tx)
        .await?;

        if let Some(warehouse_id) = sale.warehouse_id {
            let notes = match &reason {
                Some(r) => format!("Reversal from cancelled sale: {r}"),
                None => "Reversal from cancelled sale".to_string(),
            };
            for detail in &details {
                self.ledger
                    .record(
                        &mut tx,
                        NewMovement {
                            product_id: detail.product_id,
                            warehouse_id,
                            kind: crate::models::enums::MovementKind::In,
                            quantity: detail.quantity,
                            unit_cost: None,
                            currency: None,
                            reference_type: Some("SALE_CANCELLATION".to_string()),
                            reference_id: Some(sale_id),
                            notes: Some(notes.clone()),
                            created_by: Some(cancelled_by),
                        },
                    )
                    .await?;
            }
        }

        tx.commit().await?;

        tracing::info!(sale_id = %sale_id, invoice_number = %sale.invoice_number, "Sale cancelled");

        Ok((sale, details))
    }

    /// Credit sale: a regular sale plus a receivable due in `credit_days`.
    ///
    /// The receivable insert runs after the sale's transaction has
    /// committed. If it fails, the sale is deliberately left in place and
    /// the error names the invoice so the caller can reconcile.
    pub async fn create_credit_sale(
        &self,
        mut input: CreateSaleInput,
        credit_days: i64,
        created_by: Uuid,
    ) -> Result<(Sale, Vec<SaleDetail>, AccountsReceivable), AppError> {
        let customer_id = input
            .customer_id
            .ok_or_else(|| AppError::validation("Customer is required for credit sales"))?;
        if credit_days <= 0 {
            return Err(AppError::validation("Credit days must be positive"));
        }

        input.sale_type = SaleType::Credit;
        let (sale, details) = self.create(input, created_by).await?;

        let due_date = Utc::now() + Duration::days(credit_days);
        let receivable = sqlx::query_as::<_, AccountsReceivable>(
            r#"INSERT INTO accounts_receivable
               (receivable_id, sale_id, customer_id, total_amount, paid_amount, balance,
                currency, due_date, status)
               VALUES ($1, $2, $3, $4, 0, $4, $5, $6, 'PENDING')
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(sale.sale_id)
        .bind(customer_id)
        .bind(sale.total_amount)
        .bind(sale.currency)
        .bind(due_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::internal(format!(
                "Sale {} was created but the receivable could not be recorded: {e}",
                sale.invoice_number
            ))
        })?;

        Ok((sale, details, receivable))
    }

    pub async fn get(&self, sale_id: Uuid) -> Result<(Sale, Vec<SaleDetail>), AppError> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE sale_id = $1")
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Sale with id {sale_id} not found")))?;

        let details = sqlx::query_as::<_, SaleDetail>(
            "SELECT * FROM sale_details WHERE sale_id = $1 ORDER BY created_at, detail_id",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok((sale, details))
    }

    pub async fn get_by_invoice(&self, invoice_number: &str) -> Result<(Sale, Vec<SaleDetail>), AppError> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE invoice_number = $1")
            .bind(invoice_number)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Sale not found"))?;
        let sale_id = sale.sale_id;

        let details = sqlx::query_as::<_, SaleDetail>(
            "SELECT * FROM sale_details WHERE sale_id = $1 ORDER BY created_at, detail_id",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok((sale, details))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn list(
        &self,
        customer_id: Option<Uuid>,
        store_id: Option<Uuid>,
        sale_type: Option<SaleType>,
        status: Option<SaleStatus>,
        date_from: Option<chrono::DateTime<Utc>>,
        date_to: Option<chrono::DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Sale>, i64), AppError> {
        const FILTER: &str = "($1::uuid IS NULL OR customer_id = $1)
               AND ($2::uuid IS NULL OR store_id = $2)
               AND ($3::sale_type IS NULL OR sale_type = $3)
               AND ($4::sale_status IS NULL OR status = $4)
               AND ($5::timestamptz IS NULL OR sale_date >= $5)
               AND ($6::timestamptz IS NULL OR sale_date <= $6)";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT count(*) FROM sales WHERE {FILTER}"))
                .bind(customer_id)
                .bind(store_id)
                .bind(sale_type)
                .bind(status)
                .bind(date_from)
                .bind(date_to)
                .fetch_one(&self.pool)
                .await?;

        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT * FROM sales WHERE {FILTER}
             ORDER BY sale_date DESC, sale_id DESC
             LIMIT $7 OFFSET $8"
        ))
        .bind(customer_id)
        .bind(store_id)
        .bind(sale_type)
        .bind(status)
        .bind(date_from)
        .bind(date_to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((sales, total))
    }
}

async fn ensure_customer_exists(
    tx: &mut Transaction<'_, Postgres>,
    customer_id: Uuid,
) -> Result<(), AppError> {
    let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM customers WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_optional(&mut **tx)
        .await?;
    if exists.is_none() {
        return Err(AppError::not_found(format!(
            "Customer with id {customer_id} not found"
        )));
    }
    Ok(())
}

async fn ensure_warehouse_exists(
    tx: &mut Transaction<'_, Postgres>,
    warehouse_id: Uuid,
) -> Result<(), AppError> {
    let exists: Option<i32> =
        sqlx::query_scalar("SELECT 1 FROM warehouses WHERE warehouse_id = $1")
            .bind(warehouse_id)
            .fetch_optional(&mut **tx)
            .await?;
    if exists.is_none() {
        return Err(AppError::not_found(format!(
            "Warehouse with id {warehouse_id} not found"
        )));
    }
    Ok(())
}

async fn fetch_product(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> Result<Product, AppError> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE product_id = $1")
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product with id {product_id} not found")))
}
