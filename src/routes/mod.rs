pub mod customers;
pub mod inventory;
pub mod products;
pub mod receivables;
pub mod reservations;
pub mod sales;
pub mod stores;
pub mod users;

use axum::Router;

use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(inventory::routes())
        .merge(sales::routes())
        .merge(reservations::routes())
        .merge(receivables::routes())
        .merge(products::routes())
        .merge(customers::routes())
        .merge(stores::routes())
        .merge(users::routes())
}
