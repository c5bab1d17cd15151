use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::dtos::common::{PageQuery, Paginated};
use crate::dtos::inventory::{
    AdjustmentRequest, AvailabilityQuery, AvailabilityResponse, InboundRequest, LevelsQuery,
    MovementListQuery, OutboundRequest,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::enums::Currency;
use crate::models::movement::{InventoryLevel, Movement};
use crate::state::AppState;

pub async fn register_inbound(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<InboundRequest>,
) -> Result<(StatusCode, Json<Movement>), AppError> {
    let movement = state
        .ledger
        .register_inbound(
            req.product_id,
            req.warehouse_id,
            req.quantity,
            req.unit_cost,
            req.currency.unwrap_or(Currency::Ves),
            req.notes,
            auth.user_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

pub async fn register_outbound(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<OutboundRequest>,
) -> Result<(StatusCode, Json<Movement>), AppError> {
    if req.reference_type.trim().is_empty() {
        return Err(AppError::validation("Reference type is required"));
    }
    let movement = state
        .ledger
        .register_outbound(
            req.product_id,
            req.warehouse_id,
            req.quantity,
            req.reference_type,
            req.reference_id,
            req.notes,
            auth.user_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

pub async fn register_adjustment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AdjustmentRequest>,
) -> Result<(StatusCode, Json<Movement>), AppError> {
    if req.reason.trim().is_empty() {
        return Err(AppError::validation("Adjustment reason is required"));
    }
    let movement = state
        .ledger
        .register_adjustment(
            req.product_id,
            req.warehouse_id,
            req.quantity,
            Some(req.reason),
            auth.user_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

pub async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementListQuery>,
) -> Result<Json<Paginated<Movement>>, AppError> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let (movements, total) = state
        .ledger
        .list_movements(
            query.product_id,
            query.warehouse_id,
            page.limit(),
            page.offset(),
        )
        .await?;
    Ok(Json(Paginated::new(movements, total, &page)))
}

pub async fn list_levels(
    State(state): State<AppState>,
    Query(query): Query<LevelsQuery>,
) -> Result<Json<Vec<InventoryLevel>>, AppError> {
    let levels = match (query.product_id, query.warehouse_id) {
        (Some(product_id), Some(warehouse_id)) => {
            vec![state.ledger.projection_for(product_id, warehouse_id).await?]
        }
        (Some(product_id), None) => state.ledger.levels_for_product(product_id).await?,
        (None, Some(warehouse_id)) => state.ledger.levels_for_warehouse(warehouse_id).await?,
        (None, None) => {
            return Err(AppError::validation(
                "Provide product_id and/or warehouse_id",
            ))
        }
    };
    Ok(Json(levels))
}

pub async fn check_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let level = state
        .ledger
        .projection_for(query.product_id, query.warehouse_id)
        .await?;
    Ok(Json(AvailabilityResponse {
        product_id: query.product_id,
        warehouse_id: query.warehouse_id,
        requested: query.quantity,
        available: level.available_quantity,
        sufficient: level.available_quantity >= query.quantity,
    }))
}
