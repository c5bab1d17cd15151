use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::dtos::common::{PageQuery, Paginated};
use crate::dtos::reservation::{
    CancelReservationRequest, CreateReservationRequest, FulfillReservationRequest,
    FulfillmentResponse, ReminderRequest, ReservationListQuery, ReservationResponse,
    SweepResponse,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::reservation::Reservation;
use crate::services::reservation::{
    CreateReservationInput, FulfillReservationInput, ReservationItemInput,
};
use crate::state::AppState;

pub async fn create_reservation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), AppError> {
    let input = CreateReservationInput {
        customer_id: req.customer_id,
        child_id: req.child_id,
        list_id: req.list_id,
        store_id: req.store_id,
        expiration_days: req.expiration_days,
        deposit_amount: req.deposit_amount,
        currency: req.currency,
        notes: req.notes,
        items: req
            .items
            .into_iter()
            .map(|i| ReservationItemInput {
                product_id: i.product_id,
                quantity: i.quantity,
                unit_price: i.unit_price,
            })
            .collect(),
    };
    let (reservation, items) = state.reservations.create(input, auth.user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse { reservation, items }),
    ))
}

pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, AppError> {
    let (reservation, items) = state.reservations.get(id).await?;
    Ok(Json(ReservationResponse { reservation, items }))
}

pub async fn get_reservation_by_number(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<ReservationResponse>, AppError> {
    let (reservation, items) = state.reservations.get_by_number(&number).await?;
    Ok(Json(ReservationResponse { reservation, items }))
}

pub async fn list_reservations(
    State(state): State<AppState>,
    Query(query): Query<ReservationListQuery>,
) -> Result<Json<Paginated<Reservation>>, AppError> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let (reservations, total) = state
        .reservations
        .list(
            query.customer_id,
            query.store_id,
            query.status,
            page.limit(),
            page.offset(),
        )
        .await?;
    Ok(Json(Paginated::new(reservations, total, &page)))
}

pub async fn confirm_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    let reservation = state.reservations.confirm(id).await?;
    Ok(Json(reservation))
}

pub async fn fulfill_reservation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<FulfillReservationRequest>,
) -> Result<Json<FulfillmentResponse>, AppError> {
    let input = FulfillReservationInput {
        payment_method: req.payment_method,
        payment_reference: req.payment_reference,
        notes: req.notes,
    };
    let (reservation, sale, sale_items) = state
        .reservations
        .fulfill(id, input, auth.user_id)
        .await?;
    Ok(Json(FulfillmentResponse {
        reservation,
        sale,
        sale_items,
    }))
}

pub async fn cancel_reservation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelReservationRequest>,
) -> Result<Json<Reservation>, AppError> {
    let reservation = state
        .reservations
        .cancel(id, req.reason, Some(auth.user_id))
        .await?;
    Ok(Json(reservation))
}

pub async fn expire_reservations(
    State(state): State<AppState>,
) -> Result<Json<SweepResponse>, AppError> {
    let processed = state.reservations.expire_sweep().await?;
    Ok(Json(SweepResponse { processed }))
}

pub async fn send_reminders(
    State(state): State<AppState>,
    Json(req): Json<ReminderRequest>,
) -> Result<Json<SweepResponse>, AppError> {
    if req.hours_before <= 0 {
        return Err(AppError::validation("hours_before must be positive"));
    }
    let processed = state.reservations.send_reminders(req.hours_before).await?;
    Ok(Json(SweepResponse { processed }))
}
