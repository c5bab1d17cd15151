use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::sale;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sales", post(sale::create_sale).get(sale::list_sales))
        .route("/sales/credit", post(sale::create_credit_sale))
        .route("/sales/{id}", get(sale::get_sale))
        .route("/sales/invoice/{number}", get(sale::get_sale_by_invoice))
        .route("/sales/{id}/cancel", post(sale::cancel_sale))
        .route_layer(axum::middleware::from_fn(require_auth))
}
