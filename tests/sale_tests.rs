mod common;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;

use bazaar_backoffice::error::AppError;
use bazaar_backoffice::models::enums::{
    Currency, MovementKind, PaymentMethod, ReceivableStatus, SaleStatus, SaleType,
};
use bazaar_backoffice::services::sale::{CreateSaleInput, SaleLineInput};

use common::{create_product, setup, stock, TestContext};

fn sale_input(ctx: &TestContext, items: Vec<SaleLineInput>) -> CreateSaleInput {
    CreateSaleInput {
        customer_id: Some(ctx.customer_id),
        store_id: ctx.store_id,
        warehouse_id: ctx.warehouse_id,
        sale_type: SaleType::Cash,
        status: SaleStatus::Completed,
        currency: Currency::Ves,
        exchange_rate: None,
        payment_method: Some(PaymentMethod::Cash),
        payment_reference: None,
        reservation_id: None,
        notes: None,
        items,
    }
}

fn line(product_id: uuid::Uuid, quantity: Decimal) -> SaleLineInput {
    SaleLineInput {
        product_id,
        quantity,
        unit_price: None,
        discount_amount: Decimal::ZERO,
        tax_percentage: Decimal::ZERO,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn completed_sale_pulls_stock_and_numbers_the_invoice(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "SL-001", dec!(12.50)).await;
    stock(&ctx, product_id, dec!(10)).await;

    let (sale, details) = ctx
        .state
        .sales
        .create(sale_input(&ctx, vec![line(product_id, dec!(3))]), ctx.user_id)
        .await
        .unwrap();

    assert_eq!(sale.status, SaleStatus::Completed);
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].unit_price, dec!(12.50));
    assert_eq!(sale.total_amount, dec!(37.50));

    let prefix = Utc::now().format("%Y-%m").to_string();
    assert_eq!(sale.invoice_number, format!("{prefix}-0001"));

    let level = ctx
        .state
        .ledger
        .projection_for(product_id, ctx.warehouse_id)
        .await
        .unwrap();
    assert_eq!(level.available_quantity, dec!(7));

    let (movements, _) = ctx
        .state
        .ledger
        .list_movements(Some(product_id), None, 10, 0)
        .await
        .unwrap();
    let out = &movements[0];
    assert_eq!(out.kind, MovementKind::Out);
    assert_eq!(out.reference_type.as_deref(), Some("SALE"));
    assert_eq!(out.reference_id, Some(sale.sale_id));
}

#[sqlx::test(migrations = "./migrations")]
async fn invoice_numbers_increment_within_the_month(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "SL-002", dec!(5)).await;
    stock(&ctx, product_id, dec!(10)).await;

    let (first, _) = ctx
        .state
        .sales
        .create(sale_input(&ctx, vec![line(product_id, dec!(1))]), ctx.user_id)
        .await
        .unwrap();
    let (second, _) = ctx
        .state
        .sales
        .create(sale_input(&ctx, vec![line(product_id, dec!(1))]), ctx.user_id)
        .await
        .unwrap();

    assert!(first.invoice_number.ends_with("-0001"));
    assert!(second.invoice_number.ends_with("-0002"));
}

#[sqlx::test(migrations = "./migrations")]
async fn oversell_fails_atomically(pool: PgPool) {
    let ctx = setup(&pool).await;
    let a = create_product(&pool, "SL-003", dec!(5)).await;
    let b = create_product(&pool, "SL-004", dec!(5)).await;
    stock(&ctx, a, dec!(10)).await;
    stock(&ctx, b, dec!(2)).await;

    // second line exceeds stock: nothing from the first line may stick
    let err = ctx
        .state
        .sales
        .create(
            sale_input(&ctx, vec![line(a, dec!(1)), line(b, dec!(5))]),
            ctx.user_id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));

    let level_a = ctx.state.ledger.projection_for(a, ctx.warehouse_id).await.unwrap();
    let level_b = ctx.state.ledger.projection_for(b, ctx.warehouse_id).await.unwrap();
    assert_eq!(level_a.available_quantity, dec!(10));
    assert_eq!(level_b.available_quantity, dec!(2));

    let (sales, total) = ctx
        .state
        .sales
        .list(None, None, None, None, None, None, 10, 0)
        .await
        .unwrap();
    assert_eq!(total, 0);
    assert!(sales.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn line_math_discount_before_tax(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "SL-005", dec!(50.00)).await;
    stock(&ctx, product_id, dec!(10)).await;

    let item = SaleLineInput {
        product_id,
        quantity: dec!(2),
        unit_price: None,
        discount_amount: dec!(10.00),
        tax_percentage: dec!(16),
    };
    let (sale, details) = ctx
        .state
        .sales
        .create(sale_input(&ctx, vec![item]), ctx.user_id)
        .await
        .unwrap();

    assert_eq!(details[0].subtotal, dec!(90.00));
    assert_eq!(details[0].tax_amount, dec!(14.40));
    assert_eq!(details[0].total, dec!(104.40));
    assert_eq!(sale.subtotal, dec!(90.00));
    assert_eq!(sale.discount_amount, dec!(10.00));
    assert_eq!(sale.tax_amount, dec!(14.40));
    assert_eq!(sale.total_amount, dec!(104.40));
}

#[sqlx::test(migrations = "./migrations")]
async fn price_override_wins_over_catalog_price(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "SL-006", dec!(20)).await;
    stock(&ctx, product_id, dec!(5)).await;

    let item = SaleLineInput {
        product_id,
        quantity: dec!(1),
        unit_price: Some(dec!(15.00)),
        discount_amount: Decimal::ZERO,
        tax_percentage: Decimal::ZERO,
    };
    let (sale, details) = ctx
        .state
        .sales
        .create(sale_input(&ctx, vec![item]), ctx.user_id)
        .await
        .unwrap();
    assert_eq!(details[0].unit_price, dec!(15.00));
    assert_eq!(sale.total_amount, dec!(15.00));
}

#[sqlx::test(migrations = "./migrations")]
async fn draft_sale_moves_no_stock(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "SL-007", dec!(5)).await;
    stock(&ctx, product_id, dec!(10)).await;

    let mut input = sale_input(&ctx, vec![line(product_id, dec!(4))]);
    input.status = SaleStatus::Draft;
    ctx.state.sales.create(input, ctx.user_id).await.unwrap();

    let level = ctx
        .state
        .ledger
        .projection_for(product_id, ctx.warehouse_id)
        .await
        .unwrap();
    assert_eq!(level.available_quantity, dec!(10));
}

#[sqlx::test(migrations = "./migrations")]
async fn inactive_product_cannot_be_sold(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "SL-008", dec!(5)).await;
    stock(&ctx, product_id, dec!(10)).await;
    sqlx::query("UPDATE products SET status = 'DISCONTINUED' WHERE product_id = $1")
        .bind(product_id)
        .execute(&pool)
        .await
        .unwrap();

    let err = ctx
        .state
        .sales
        .create(sale_input(&ctx, vec![line(product_id, dec!(1))]), ctx.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn cancel_restores_stock_and_is_terminal(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "SL-009", dec!(5)).await;
    stock(&ctx, product_id, dec!(10)).await;

    let (sale, _) = ctx
        .state
        .sales
        .create(sale_input(&ctx, vec![line(product_id, dec!(4))]), ctx.user_id)
        .await
        .unwrap();

    let (cancelled, _) = ctx
        .state
        .sales
        .cancel(sale.sale_id, Some("Customer returned".into()), ctx.user_id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, SaleStatus::Cancelled);

    let level = ctx
        .state
        .ledger
        .projection_for(product_id, ctx.warehouse_id)
        .await
        .unwrap();
    assert_eq!(level.available_quantity, dec!(10));

    let (movements, _) = ctx
        .state
        .ledger
        .list_movements(Some(product_id), None, 10, 0)
        .await
        .unwrap();
    assert_eq!(movements[0].kind, MovementKind::In);
    assert_eq!(
        movements[0].reference_type.as_deref(),
        Some("SALE_CANCELLATION")
    );

    // cancelling twice is a state error
    let err = ctx
        .state
        .sales
        .cancel(sale.sale_id, None, ctx.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn credit_sale_opens_a_receivable(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "SL-010", dec!(30)).await;
    stock(&ctx, product_id, dec!(10)).await;

    let (sale, _, receivable) = ctx
        .state
        .sales
        .create_credit_sale(
            sale_input(&ctx, vec![line(product_id, dec!(2))]),
            15,
            ctx.user_id,
        )
        .await
        .unwrap();

    assert_eq!(sale.sale_type, SaleType::Credit);
    assert_eq!(receivable.sale_id, Some(sale.sale_id));
    assert_eq!(receivable.total_amount, dec!(60.00));
    assert_eq!(receivable.paid_amount, Decimal::ZERO);
    assert_eq!(receivable.balance, dec!(60.00));
    assert_eq!(receivable.status, ReceivableStatus::Pending);

    let days_out = (receivable.due_date - Utc::now()).num_days();
    assert!((14..=15).contains(&days_out));
}

#[sqlx::test(migrations = "./migrations")]
async fn credit_sale_requires_a_customer(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "SL-011", dec!(5)).await;
    stock(&ctx, product_id, dec!(10)).await;

    let mut input = sale_input(&ctx, vec![line(product_id, dec!(1))]);
    input.customer_id = None;
    let err = ctx
        .state
        .sales
        .create_credit_sale(input, 15, ctx.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn unknown_warehouse_is_not_found_not_out_of_stock(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "SL-011", dec!(5)).await;
    stock(&ctx, product_id, dec!(10)).await;

    let mut input = sale_input(&ctx, vec![line(product_id, dec!(1))]);
    input.warehouse_id = uuid::Uuid::new_v4();
    let err = ctx.state.sales.create(input, ctx.user_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
