use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::dtos::common::{PageQuery, Paginated};
use crate::dtos::sale::{
    CancelSaleRequest, CreateCreditSaleRequest, CreateSaleRequest, CreditSaleResponse,
    SaleListQuery, SaleResponse,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::sale::Sale;
use crate::services::sale::{CreateSaleInput, SaleLineInput};
use crate::state::AppState;

fn to_input(req: CreateSaleRequest) -> CreateSaleInput {
    CreateSaleInput {
        customer_id: req.customer_id,
        store_id: req.store_id,
        warehouse_id: req.warehouse_id,
        sale_type: req.sale_type,
        status: req.status,
        currency: req.currency,
        exchange_rate: req.exchange_rate,
        payment_method: req.payment_method,
        payment_reference: req.payment_reference,
        reservation_id: None,
        notes: req.notes,
        items: req
            .items
            .into_iter()
            .map(|i| SaleLineInput {
                product_id: i.product_id,
                quantity: i.quantity,
                unit_price: i.unit_price,
                discount_amount: i.discount_amount,
                tax_percentage: i.tax_percentage,
            })
            .collect(),
    }
}

pub async fn create_sale(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), AppError> {
    let (sale, items) = state.sales.create(to_input(req), auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(SaleResponse { sale, items })))
}

pub async fn create_credit_sale(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateCreditSaleRequest>,
) -> Result<(StatusCode, Json<CreditSaleResponse>), AppError> {
    let (sale, items, receivable) = state
        .sales
        .create_credit_sale(to_input(req.sale), req.credit_days, auth.user_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreditSaleResponse {
            sale,
            items,
            receivable,
        }),
    ))
}

pub async fn get_sale_by_invoice(
    State(state): State<AppState>,
    Path(invoice_number): Path<String>,
) -> Result<Json<SaleResponse>, AppError> {
    let (sale, items) = state.sales.get_by_invoice(&invoice_number).await?;
    Ok(Json(SaleResponse { sale, items }))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SaleResponse>, AppError> {
    let (sale, items) = state.sales.get(id).await?;
    Ok(Json(SaleResponse { sale, items }))
}

pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<SaleListQuery>,
) -> Result<Json<Paginated<Sale>>, AppError> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let (sales, total) = state
        .sales
        .list(
            query.customer_id,
            query.store_id,
            query.sale_type,
            query.status,
            query.date_from,
            query.date_to,
            page.limit(),
            page.offset(),
        )
        .await?;
    Ok(Json(Paginated::new(sales, total, &page)))
}

pub async fn cancel_sale(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelSaleRequest>,
) -> Result<Json<SaleResponse>, AppError> {
    let (sale, items) = state.sales.cancel(id, req.reason, auth.user_id).await?;
    Ok(Json(SaleResponse { sale, items }))
}
