use axum::{routing::get, Router};

use crate::handlers::customer;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/customers",
            get(customer::list_customers).post(customer::create_customer),
        )
        .route("/customers/{id}", get(customer::get_customer))
        .route(
            "/customers/{id}/children",
            get(customer::list_children).post(customer::add_child),
        )
        .route_layer(axum::middleware::from_fn(require_auth))
}
