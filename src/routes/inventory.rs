use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::inventory;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inventory/levels", get(inventory::list_levels))
        .route("/inventory/availability", get(inventory::check_availability))
        .route("/inventory/movements", get(inventory::list_movements))
        .route("/inventory/movements/inbound", post(inventory::register_inbound))
        .route("/inventory/movements/outbound", post(inventory::register_outbound))
        .route("/inventory/movements/adjustment", post(inventory::register_adjustment))
        .route_layer(axum::middleware::from_fn(require_auth))
}
