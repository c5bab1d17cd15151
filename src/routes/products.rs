use axum::{routing::get, Router};

use crate::handlers::product;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(product::list_products).post(product::create_product),
        )
        .route(
            "/products/{id}",
            get(product::get_product).put(product::update_product),
        )
        .route_layer(axum::middleware::from_fn(require_auth))
}
