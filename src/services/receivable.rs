// src/services/receivable.rs
//
// Accounts receivable: one open balance per credit sale, paid down through
// customer payments. Balance is always total minus paid and the status is
// recomputed from those two numbers on every write.
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::enums::{Currency, PaymentMethod, ReceivableStatus};
use crate::models::receivable::{AccountsReceivable, CustomerPayment};

#[derive(Debug, Clone)]
pub struct RegisterPaymentInput {
    pub amount: Decimal,
    pub currency: Currency,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct ReceivableLedger {
    pool: PgPool,
}

impl ReceivableLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies a payment against an open receivable. The row lock makes two
    /// concurrent payments settle sequentially, so the balance can never be
    /// overdrawn.
    pub async fn register_payment(
        &self,
        receivable_id: Uuid,
        input: RegisterPaymentInput,
        created_by: Uuid,
    ) -> Result<(AccountsReceivable, CustomerPayment), AppError> {
        if input.amount <= Decimal::ZERO {
            return Err(AppError::validation("Payment amount must be positive"));
        }

        let mut tx = self.pool.begin().await?;

        let receivable = sqlx::query_as::<_, AccountsReceivable>(
            "SELECT * FROM accounts_receivable WHERE receivable_id = $1 FOR UPDATE",
        )
        .bind(receivable_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!("Receivable with id {receivable_id} not found"))
        })?;

        if matches!(
            receivable.status,
            ReceivableStatus::Paid | ReceivableStatus::Cancelled
        ) {
            return Err(AppError::invalid_state(format!(
                "Receivable is already {:?} and cannot take payments",
                receivable.status
            )));
        }
        if input.currency != receivable.currency {
            return Err(AppError::validation(format!(
                "Payment currency {} does not match receivable currency {}",
                input.currency, receivable.currency
            )));
        }
        if input.amount > receivable.balance {
            return Err(AppError::validation(format!(
                "Payment of {} exceeds outstanding balance of {}",
                input.amount, receivable.balance
            )));
        }

        let payment = sqlx::query_as::<_, CustomerPayment>(
            r#"INSERT INTO customer_payments
               (payment_id, receivable_id, amount, currency, payment_method,
                reference, notes, created_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(receivable_id)
        .bind(input.amount)
        .bind(input.currency)
        .bind(input.payment_method)
        .bind(&input.payment_reference)
        .bind(&input.notes)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        let paid_amount = receivable.paid_amount + input.amount;
        let balance = receivable.total_amount - paid_amount;
        let status = if balance <= Decimal::ZERO {
            ReceivableStatus::Paid
        } else {
            ReceivableStatus::PartiallyPaid
        };

        let receivable = sqlx::query_as::<_, AccountsReceivable>(
            r#"UPDATE accounts_receivable
               SET paid_amount = $2, balance = $3, status = $4
               WHERE receivable_id = $1
               RETURNING *"#,
        )
        .bind(receivable_id)
        .bind(paid_amount)
        .bind(balance)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            receivable_id = %receivable_id,
            amount = %payment.amount,
            balance = %receivable.balance,
            status = ?receivable.status,
            "Payment registered"
        );

        Ok((receivable, payment))
    }

    /// Voids a receivable nothing has been paid against yet.
    pub async fn cancel(&self, receivable_id: Uuid) -> Result<AccountsReceivable, AppError> {
        let mut tx = self.pool.begin().await?;

        let receivable = sqlx::query_as::<_, AccountsReceivable>(
            "SELECT * FROM accounts_receivable WHERE receivable_id = $1 FOR UPDATE",
        )
        .bind(receivable_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!("Receivable with id {receivable_id} not found"))
        })?;

        if receivable.paid_amount > Decimal::ZERO {
            return Err(AppError::invalid_state(
                "Cannot cancel a receivable with payments applied",
            ));
        }
        if matches!(
            receivable.status,
            ReceivableStatus::Paid | ReceivableStatus::Cancelled
        ) {
            return Err(AppError::invalid_state(format!(
                "Receivable is already {:?}",
                receivable.status
            )));
        }

        let receivable = sqlx::query_as::<_, AccountsReceivable>(
            "UPDATE accounts_receivable SET status = 'CANCELLED' WHERE receivable_id = $1 RETURNING *",
        )
        .bind(receivable_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(receivable)
    }

    /// Flags open receivables past their due date. Returns the number of
    /// rows moved to OVERDUE.
    pub async fn overdue_sweep(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"UPDATE accounts_receivable
               SET status = 'OVERDUE'
               WHERE status IN ('PENDING', 'PARTIALLY_PAID') AND due_date < now()"#,
        )
        .execute(&self.pool)
        .await?;

        let flagged = result.rows_affected();
        if flagged > 0 {
            tracing::info!(count = flagged, "Flagged overdue receivables");
        }
        Ok(flagged)
    }

    pub async fn get(&self, receivable_id: Uuid) -> Result<AccountsReceivable, AppError> {
        sqlx::query_as::<_, AccountsReceivable>(
            "SELECT * FROM accounts_receivable WHERE receivable_id = $1",
        )
        .bind(receivable_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Receivable with id {receivable_id} not found")))
    }

    pub async fn list(
        &self,
        customer_id: Option<Uuid>,
        status: Option<ReceivableStatus>,
        due_before: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AccountsReceivable>, i64), AppError> {
        const FILTER: &str = "($1::uuid IS NULL OR customer_id = $1)
               AND ($2::receivable_status IS NULL OR status = $2)
               AND ($3::timestamptz IS NULL OR due_date <= $3)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT count(*) FROM accounts_receivable WHERE {FILTER}"
        ))
        .bind(customer_id)
        .bind(status)
        .bind(due_before)
        .fetch_one(&self.pool)
        .await?;

        let receivables = sqlx::query_as::<_, AccountsReceivable>(&format!(
            "SELECT * FROM accounts_receivable WHERE {FILTER}
             ORDER BY due_date, receivable_id
             LIMIT $4 OFFSET $5"
        ))
        .bind(customer_id)
        .bind(status)
        .bind(due_before)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((receivables, total))
    }

    pub async fn payments_for(
        &self,
        receivable_id: Uuid,
    ) -> Result<Vec<CustomerPayment>, AppError> {
        // 404 on an unknown receivable rather than an empty list
        self.get(receivable_id).await?;

        let payments = sqlx::query_as::<_, CustomerPayment>(
            "SELECT * FROM customer_payments WHERE receivable_id = $1 ORDER BY payment_date, payment_id",
        )
        .bind(receivable_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Outstanding balance across a customer's open receivables.
    pub async fn customer_balance(&self, customer_id: Uuid) -> Result<Decimal, AppError> {
        let balance: Option<Decimal> = sqlx::query_scalar(
            r#"SELECT sum(balance) FROM accounts_receivable
               WHERE customer_id = $1
                 AND status IN ('PENDING', 'PARTIALLY_PAID', 'OVERDUE')"#,
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(balance.unwrap_or(Decimal::ZERO))
    }
}
