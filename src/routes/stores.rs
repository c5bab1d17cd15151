use axum::{routing::get, Router};

use crate::handlers::store;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stores", get(store::list_stores).post(store::create_store))
        .route(
            "/stores/{id}/warehouses",
            get(store::list_warehouses).post(store::add_warehouse),
        )
        .route_layer(axum::middleware::from_fn(require_auth))
}
