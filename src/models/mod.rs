pub mod customer;
pub mod enums;
pub mod movement;
pub mod product;
pub mod receivable;
pub mod reservation;
pub mod sale;
pub mod store;
pub mod user;
