// src/state.rs
use sqlx::PgPool;

use crate::services::ledger::MovementLedger;
use crate::services::notifier::Notifier;
use crate::services::receivable::ReceivableLedger;
use crate::services::reservation::ReservationEngine;
use crate::services::sale::SaleEngine;
use crate::services::sequence::SequenceGenerator;

/// Shared application state: the pool plus the domain engines wired on top
/// of it. Everything inside is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub ledger: MovementLedger,
    pub sales: SaleEngine,
    pub reservations: ReservationEngine,
    pub receivables: ReceivableLedger,
}

impl AppState {
    pub fn new(db_pool: PgPool, notifier: Notifier) -> Self {
        let ledger = MovementLedger::new(db_pool.clone());
        let sequence = SequenceGenerator::new();
        let sales = SaleEngine::new(db_pool.clone(), ledger.clone(), sequence.clone());
        let reservations = ReservationEngine::new(
            db_pool.clone(),
            ledger.clone(),
            sequence,
            sales.clone(),
            notifier,
        );
        let receivables = ReceivableLedger::new(db_pool.clone());

        Self {
            db_pool,
            ledger,
            sales,
            reservations,
            receivables,
        }
    }
}
