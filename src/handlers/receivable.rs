use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::dtos::common::{PageQuery, Paginated};
use crate::dtos::receivable::{
    CustomerBalanceResponse, PaymentResponse, ReceivableListQuery, RegisterPaymentRequest,
};
use crate::dtos::reservation::SweepResponse;
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::receivable::{AccountsReceivable, CustomerPayment};
use crate::services::receivable::RegisterPaymentInput;
use crate::state::AppState;

pub async fn get_receivable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountsReceivable>, AppError> {
    let receivable = state.receivables.get(id).await?;
    Ok(Json(receivable))
}

pub async fn list_receivables(
    State(state): State<AppState>,
    Query(query): Query<ReceivableListQuery>,
) -> Result<Json<Paginated<AccountsReceivable>>, AppError> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let (receivables, total) = state
        .receivables
        .list(
            query.customer_id,
            query.status,
            query.due_before,
            page.limit(),
            page.offset(),
        )
        .await?;
    Ok(Json(Paginated::new(receivables, total, &page)))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CustomerPayment>>, AppError> {
    let payments = state.receivables.payments_for(id).await?;
    Ok(Json(payments))
}

pub async fn register_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<RegisterPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), AppError> {
    let input = RegisterPaymentInput {
        amount: req.amount,
        currency: req.currency,
        payment_method: req.payment_method,
        payment_reference: req.payment_reference,
        notes: req.notes,
    };
    let (receivable, payment) = state
        .receivables
        .register_payment(id, input, auth.user_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            receivable,
            payment,
        }),
    ))
}

pub async fn customer_balance(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<CustomerBalanceResponse>, AppError> {
    let outstanding_balance = state.receivables.customer_balance(customer_id).await?;
    Ok(Json(CustomerBalanceResponse {
        customer_id,
        outstanding_balance,
    }))
}

pub async fn sweep_overdue(
    State(state): State<AppState>,
) -> Result<Json<SweepResponse>, AppError> {
    let processed = state.receivables.overdue_sweep().await?;
    Ok(Json(SweepResponse { processed }))
}
