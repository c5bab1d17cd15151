use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::receivable;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/receivables", get(receivable::list_receivables))
        .route("/receivables/{id}", get(receivable::get_receivable))
        .route(
            "/receivables/{id}/payments",
            get(receivable::list_payments).post(receivable::register_payment),
        )
        .route("/receivables/overdue/sweep", post(receivable::sweep_overdue))
        .route(
            "/customers/{id}/balance",
            get(receivable::customer_balance),
        )
        .route_layer(axum::middleware::from_fn(require_auth))
}
