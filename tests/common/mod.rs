#![allow(dead_code)]

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use bazaar_backoffice::models::enums::Currency;
use bazaar_backoffice::services::notifier::Notifier;
use bazaar_backoffice::state::AppState;

pub struct TestContext {
    pub state: AppState,
    pub user_id: Uuid,
    pub store_id: Uuid,
    pub warehouse_id: Uuid,
    pub customer_id: Uuid,
}

/// One user, one store with a warehouse, one customer.
pub async fn setup(pool: &PgPool) -> TestContext {
    let state = AppState::new(pool.clone(), Notifier::disconnected());

    let user_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (user_id, username, password_hash, role) VALUES ($1, $2, 'x', 'admin')",
    )
    .bind(user_id)
    .bind(format!("clerk-{user_id}"))
    .execute(pool)
    .await
    .unwrap();

    let store_id = Uuid::new_v4();
    sqlx::query("INSERT INTO stores (store_id, name) VALUES ($1, 'Main Store')")
        .bind(store_id)
        .execute(pool)
        .await
        .unwrap();

    let warehouse_id = Uuid::new_v4();
    sqlx::query("INSERT INTO warehouses (warehouse_id, store_id, name) VALUES ($1, $2, 'Back room')")
        .bind(warehouse_id)
        .bind(store_id)
        .execute(pool)
        .await
        .unwrap();

    let customer_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO customers (customer_id, tax_id, first_name, last_name, email)
         VALUES ($1, $2, 'Ana', 'Perez', 'ana@example.com')",
    )
    .bind(customer_id)
    .bind(format!("V-{}", &user_id.simple().to_string()[..8]))
    .execute(pool)
    .await
    .unwrap();

    TestContext {
        state,
        user_id,
        store_id,
        warehouse_id,
        customer_id,
    }
}

pub async fn create_product(pool: &PgPool, sku: &str, selling_price: Decimal) -> Uuid {
    let product_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO products (product_id, sku, name, status, selling_price, cost_price)
         VALUES ($1, $2, $2, 'ACTIVE', $3, $3)",
    )
    .bind(product_id)
    .bind(sku)
    .bind(selling_price)
    .execute(pool)
    .await
    .unwrap();
    product_id
}

/// Puts stock on the shelf through a regular inbound movement.
pub async fn stock(ctx: &TestContext, product_id: Uuid, quantity: Decimal) {
    ctx.state
        .ledger
        .register_inbound(
            product_id,
            ctx.warehouse_id,
            quantity,
            Decimal::ONE,
            Currency::Ves,
            None,
            ctx.user_id,
        )
        .await
        .unwrap();
}
