use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::dtos::common::{PageQuery, Paginated};
use crate::dtos::customer::{CreateChildRequest, CreateCustomerRequest, CustomerListQuery};
use crate::error::AppError;
use crate::models::customer::{Customer, CustomerChild};
use crate::state::AppState;

pub async fn create_customer(
    State(state): State<AppState>,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    if req.tax_id.trim().is_empty() {
        return Err(AppError::validation("Tax id is required"));
    }
    let has_name = req.business_name.as_deref().is_some_and(|s| !s.trim().is_empty())
        || req.first_name.as_deref().is_some_and(|s| !s.trim().is_empty());
    if !has_name {
        return Err(AppError::validation(
            "Either a business name or a first name is required",
        ));
    }

    let customer = sqlx::query_as::<_, Customer>(
        r#"INSERT INTO customers
           (customer_id, tax_id, first_name, last_name, business_name, email, phone)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(req.tax_id.trim())
    .bind(req.first_name)
    .bind(req.last_name)
    .bind(req.business_name)
    .bind(req.email)
    .bind(req.phone)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        if let Some(db_err) = e.as_database_error() {
            if db_err.code().as_deref() == Some("23505") {
                return AppError::conflict("A customer with this tax id already exists");
            }
        }
        AppError::db(e)
    })?;

    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>, AppError> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE customer_id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Customer with id {id} not found")))?;
    Ok(Json(customer))
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerListQuery>,
) -> Result<Json<Paginated<Customer>>, AppError> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let pattern = query.search.map(|s| format!("%{}%", s.trim()));

    const FILTER: &str = "($1::text IS NULL
           OR tax_id ILIKE $1 OR business_name ILIKE $1
           OR first_name ILIKE $1 OR last_name ILIKE $1)";

    let total: i64 = sqlx::query_scalar(&format!("SELECT count(*) FROM customers WHERE {FILTER}"))
        .bind(&pattern)
        .fetch_one(&state.db_pool)
        .await?;

    let customers = sqlx::query_as::<_, Customer>(&format!(
        "SELECT * FROM customers WHERE {FILTER} ORDER BY created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(&pattern)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(Paginated::new(customers, total, &page)))
}

pub async fn add_child(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(req): Json<CreateChildRequest>,
) -> Result<(StatusCode, Json<CustomerChild>), AppError> {
    if req.full_name.trim().is_empty() {
        return Err(AppError::validation("Child name is required"));
    }

    let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM customers WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_optional(&state.db_pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::not_found(format!(
            "Customer with id {customer_id} not found"
        )));
    }

    let child = sqlx::query_as::<_, CustomerChild>(
        r#"INSERT INTO customer_children (child_id, customer_id, full_name)
           VALUES ($1, $2, $3)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(customer_id)
    .bind(req.full_name.trim())
    .fetch_one(&state.db_pool)
    .await?;

    Ok((StatusCode::CREATED, Json(child)))
}

pub async fn list_children(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Vec<CustomerChild>>, AppError> {
    let children = sqlx::query_as::<_, CustomerChild>(
        "SELECT * FROM customer_children WHERE customer_id = $1 ORDER BY full_name",
    )
    .bind(customer_id)
    .fetch_all(&state.db_pool)
    .await?;
    Ok(Json(children))
}
