use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::reservation;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/reservations",
            post(reservation::create_reservation).get(reservation::list_reservations),
        )
        .route("/reservations/{id}", get(reservation::get_reservation))
        .route(
            "/reservations/number/{number}",
            get(reservation::get_reservation_by_number),
        )
        .route("/reservations/{id}/confirm", post(reservation::confirm_reservation))
        .route("/reservations/{id}/fulfill", post(reservation::fulfill_reservation))
        .route("/reservations/{id}/cancel", post(reservation::cancel_reservation))
        .route("/reservations/expire", post(reservation::expire_reservations))
        .route("/reservations/reminders", post(reservation::send_reminders))
        .route_layer(axum::middleware::from_fn(require_auth))
}
