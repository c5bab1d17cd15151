use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::dtos::common::{PageQuery, Paginated};
use crate::dtos::product::{CreateProductRequest, ProductListQuery, UpdateProductRequest};
use crate::error::AppError;
use crate::models::product::Product;
use crate::state::AppState;

pub async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    if req.sku.trim().is_empty() {
        return Err(AppError::validation("SKU is required"));
    }
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    if req.selling_price < Decimal::ZERO || req.cost_price < Decimal::ZERO {
        return Err(AppError::validation("Prices cannot be negative"));
    }

    let product = sqlx::query_as::<_, Product>(
        r#"INSERT INTO products (product_id, sku, name, status, selling_price, cost_price)
           VALUES ($1, $2, $3, 'ACTIVE', $4, $5)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(req.sku.trim())
    .bind(req.name.trim())
    .bind(req.selling_price)
    .bind(req.cost_price)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        if let Some(db_err) = e.as_database_error() {
            if db_err.code().as_deref() == Some("23505") {
                return AppError::conflict("SKU already exists");
            }
        }
        AppError::db(e)
    })?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE product_id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product with id {id} not found")))?;
    Ok(Json(product))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Paginated<Product>>, AppError> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let pattern = query.search.map(|s| format!("%{}%", s.trim()));

    const FILTER: &str = "($1::product_status IS NULL OR status = $1)
           AND ($2::text IS NULL OR name ILIKE $2 OR sku ILIKE $2)";

    let total: i64 = sqlx::query_scalar(&format!("SELECT count(*) FROM products WHERE {FILTER}"))
        .bind(query.status)
        .bind(&pattern)
        .fetch_one(&state.db_pool)
        .await?;

    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT * FROM products WHERE {FILTER} ORDER BY name LIMIT $3 OFFSET $4"
    ))
    .bind(query.status)
    .bind(&pattern)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(Paginated::new(products, total, &page)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<Product>, AppError> {
    if let Some(price) = req.selling_price {
        if price < Decimal::ZERO {
            return Err(AppError::validation("Selling price cannot be negative"));
        }
    }
    if let Some(price) = req.cost_price {
        if price < Decimal::ZERO {
            return Err(AppError::validation("Cost price cannot be negative"));
        }
    }

    let product = sqlx::query_as::<_, Product>(
        r#"UPDATE products
           SET name = coalesce($2, name),
               status = coalesce($3, status),
               selling_price = coalesce($4, selling_price),
               cost_price = coalesce($5, cost_price)
           WHERE product_id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(req.name)
    .bind(req.status)
    .bind(req.selling_price)
    .bind(req.cost_price)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Product with id {id} not found")))?;

    Ok(Json(product))
}
