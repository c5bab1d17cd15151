use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::user;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    // Login and registration are the only unauthenticated endpoints.
    let open = Router::new()
        .route("/auth/register", post(user::register_user))
        .route("/auth/login", post(user::login_user));

    let protected = Router::new()
        .route("/auth/me", get(user::me))
        .route_layer(axum::middleware::from_fn(require_auth));

    open.merge(protected)
}
