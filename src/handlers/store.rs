use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::dtos::store::{CreateStoreRequest, CreateWarehouseRequest};
use crate::error::AppError;
use crate::models::store::{Store, Warehouse};
use crate::state::AppState;

pub async fn create_store(
    State(state): State<AppState>,
    Json(req): Json<CreateStoreRequest>,
) -> Result<(StatusCode, Json<Store>), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Store name is required"));
    }

    let store = sqlx::query_as::<_, Store>(
        "INSERT INTO stores (store_id, name, address) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(req.name.trim())
    .bind(req.address)
    .fetch_one(&state.db_pool)
    .await?;

    Ok((StatusCode::CREATED, Json(store)))
}

pub async fn list_stores(State(state): State<AppState>) -> Result<Json<Vec<Store>>, AppError> {
    let stores = sqlx::query_as::<_, Store>("SELECT * FROM stores ORDER BY name")
        .fetch_all(&state.db_pool)
        .await?;
    Ok(Json(stores))
}

pub async fn add_warehouse(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
    Json(req): Json<CreateWarehouseRequest>,
) -> Result<(StatusCode, Json<Warehouse>), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Warehouse name is required"));
    }

    let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM stores WHERE store_id = $1")
        .bind(store_id)
        .fetch_optional(&state.db_pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::not_found(format!(
            "Store with id {store_id} not found"
        )));
    }

    let warehouse = sqlx::query_as::<_, Warehouse>(
        "INSERT INTO warehouses (warehouse_id, store_id, name) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(store_id)
    .bind(req.name.trim())
    .fetch_one(&state.db_pool)
    .await?;

    Ok((StatusCode::CREATED, Json(warehouse)))
}

pub async fn list_warehouses(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
) -> Result<Json<Vec<Warehouse>>, AppError> {
    let warehouses = sqlx::query_as::<_, Warehouse>(
        "SELECT * FROM warehouses WHERE store_id = $1 ORDER BY created_at",
    )
    .bind(store_id)
    .fetch_all(&state.db_pool)
    .await?;
    Ok(Json(warehouses))
}
