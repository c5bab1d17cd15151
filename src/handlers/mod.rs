pub mod customer;
pub mod inventory;
pub mod product;
pub mod receivable;
pub mod reservation;
pub mod sale;
pub mod store;
pub mod user;
