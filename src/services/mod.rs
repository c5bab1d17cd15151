pub mod ledger;
pub mod notifier;
pub mod receivable;
pub mod reservation;
pub mod sale;
pub mod sequence;
