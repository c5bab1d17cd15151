// src/services/sequence.rs
//
// Business identifier allocation. Numbers are prefix-scoped counters
// (invoices "YYYY-MM-NNNN", reservations "RES-YYYY-MM-NNNN"): gaps are
// tolerated, duplicates are not. The count-then-insert step runs under a
// transaction-scoped advisory lock keyed on the prefix, so two concurrent
// callers in the same month cannot observe the same count; the unique
// index on the owning column is the backstop.
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};

use crate::error::AppError;

#[derive(Debug, Clone, Copy)]
pub enum SequenceScope {
    Invoice,
    Reservation,
}

impl SequenceScope {
    fn table(&self) -> &'static str {
        match self {
            SequenceScope::Invoice => "sales",
            SequenceScope::Reservation => "reservations",
        }
    }

    fn column(&self) -> &'static str {
        match self {
            SequenceScope::Invoice => "invoice_number",
            SequenceScope::Reservation => "reservation_number",
        }
    }

    fn prefix(&self, now: DateTime<Utc>) -> String {
        match self {
            SequenceScope::Invoice => now.format("%Y-%m").to_string(),
            SequenceScope::Reservation => format!("RES-{}", now.format("%Y-%m")),
        }
    }
}

pub fn format_number(prefix: &str, count: i64) -> String {
    format!("{}-{:04}", prefix, count + 1)
}

#[derive(Clone)]
pub struct SequenceGenerator;

impl SequenceGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Allocates the next number for `scope` inside the caller's
    /// transaction. Must be called from the same transaction that inserts
    /// the owning row, otherwise the advisory lock is released before the
    /// row exists and a concurrent caller can reuse the count.
    pub async fn next(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        scope: SequenceScope,
    ) -> Result<String, AppError> {
        let prefix = scope.prefix(Utc::now());

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&prefix)
            .execute(&mut **tx)
            .await?;

        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT count(*) FROM {} WHERE {} LIKE $1",
            scope.table(),
            scope.column()
        ))
        .bind(format!("{prefix}-%"))
        .fetch_one(&mut **tx)
        .await?;

        Ok(format_number(&prefix, count))
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}
