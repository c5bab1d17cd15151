mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;

use bazaar_backoffice::error::AppError;
use bazaar_backoffice::models::enums::{
    Currency, PaymentMethod, ReceivableStatus, SaleStatus, SaleType,
};
use bazaar_backoffice::models::receivable::AccountsReceivable;
use bazaar_backoffice::services::receivable::RegisterPaymentInput;
use bazaar_backoffice::services::sale::{CreateSaleInput, SaleLineInput};

use common::{create_product, setup, stock, TestContext};

/// Opens a credit sale for `quantity` units at 30.00 each and returns its
/// receivable.
async fn open_receivable(
    pool: &PgPool,
    ctx: &TestContext,
    sku: &str,
    quantity: Decimal,
) -> AccountsReceivable {
    let product_id = create_product(pool, sku, dec!(30)).await;
    stock(ctx, product_id, dec!(100)).await;

    let input = CreateSaleInput {
        customer_id: Some(ctx.customer_id),
        store_id: ctx.store_id,
        warehouse_id: ctx.warehouse_id,
        sale_type: SaleType::Credit,
        status: SaleStatus::Completed,
        currency: Currency::Ves,
        exchange_rate: None,
        payment_method: None,
        payment_reference: None,
        reservation_id: None,
        notes: None,
        items: vec![SaleLineInput {
            product_id,
            quantity,
            unit_price: None,
            discount_amount: Decimal::ZERO,
            tax_percentage: Decimal::ZERO,
        }],
    };
    let (_, _, receivable) = ctx
        .state
        .sales
        .create_credit_sale(input, 30, ctx.user_id)
        .await
        .unwrap();
    receivable
}

fn payment(amount: Decimal) -> RegisterPaymentInput {
    RegisterPaymentInput {
        amount,
        currency: Currency::Ves,
        payment_method: PaymentMethod::Cash,
        payment_reference: None,
        notes: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn partial_then_full_payment(pool: PgPool) {
    let ctx = setup(&pool).await;
    let receivable = open_receivable(&pool, &ctx, "AR-001", dec!(2)).await;
    assert_eq!(receivable.total_amount, dec!(60.00));

    let (after_first, first) = ctx
        .state
        .receivables
        .register_payment(receivable.receivable_id, payment(dec!(25.00)), ctx.user_id)
        .await
        .unwrap();
    assert_eq!(first.amount, dec!(25.00));
    assert_eq!(after_first.paid_amount, dec!(25.00));
    assert_eq!(after_first.balance, dec!(35.00));
    assert_eq!(after_first.status, ReceivableStatus::PartiallyPaid);

    let (after_second, _) = ctx
        .state
        .receivables
        .register_payment(receivable.receivable_id, payment(dec!(35.00)), ctx.user_id)
        .await
        .unwrap();
    assert_eq!(after_second.balance, Decimal::ZERO);
    assert_eq!(after_second.status, ReceivableStatus::Paid);

    // settled: no further payments
    let err = ctx
        .state
        .receivables
        .register_payment(receivable.receivable_id, payment(dec!(1)), ctx.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let payments = ctx
        .state
        .receivables
        .payments_for(receivable.receivable_id)
        .await
        .unwrap();
    assert_eq!(payments.len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn overpayment_is_rejected(pool: PgPool) {
    let ctx = setup(&pool).await;
    let receivable = open_receivable(&pool, &ctx, "AR-002", dec!(1)).await;

    let err = ctx
        .state
        .receivables
        .register_payment(receivable.receivable_id, payment(dec!(30.01)), ctx.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let reloaded = ctx
        .state
        .receivables
        .get(receivable.receivable_id)
        .await
        .unwrap();
    assert_eq!(reloaded.balance, dec!(30.00));
    assert_eq!(reloaded.status, ReceivableStatus::Pending);
}

#[sqlx::test(migrations = "./migrations")]
async fn nonpositive_and_wrong_currency_payments_rejected(pool: PgPool) {
    let ctx = setup(&pool).await;
    let receivable = open_receivable(&pool, &ctx, "AR-003", dec!(1)).await;

    let err = ctx
        .state
        .receivables
        .register_payment(receivable.receivable_id, payment(Decimal::ZERO), ctx.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let mut usd = payment(dec!(10));
    usd.currency = Currency::Usd;
    let err = ctx
        .state
        .receivables
        .register_payment(receivable.receivable_id, usd, ctx.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn overdue_sweep_flags_open_past_due(pool: PgPool) {
    let ctx = setup(&pool).await;
    let overdue = open_receivable(&pool, &ctx, "AR-004", dec!(1)).await;
    let current = open_receivable(&pool, &ctx, "AR-005", dec!(1)).await;

    sqlx::query(
        "UPDATE accounts_receivable SET due_date = now() - interval '1 day' WHERE receivable_id = $1",
    )
    .bind(overdue.receivable_id)
    .execute(&pool)
    .await
    .unwrap();

    let flagged = ctx.state.receivables.overdue_sweep().await.unwrap();
    assert_eq!(flagged, 1);

    let reloaded = ctx.state.receivables.get(overdue.receivable_id).await.unwrap();
    assert_eq!(reloaded.status, ReceivableStatus::Overdue);
    let untouched = ctx.state.receivables.get(current.receivable_id).await.unwrap();
    assert_eq!(untouched.status, ReceivableStatus::Pending);

    // overdue receivables still take payments
    let (after, _) = ctx
        .state
        .receivables
        .register_payment(overdue.receivable_id, payment(dec!(30.00)), ctx.user_id)
        .await
        .unwrap();
    assert_eq!(after.status, ReceivableStatus::Paid);
}

#[sqlx::test(migrations = "./migrations")]
async fn cancel_only_before_any_payment(pool: PgPool) {
    let ctx = setup(&pool).await;
    let untouched = open_receivable(&pool, &ctx, "AR-006", dec!(1)).await;
    let paid_down = open_receivable(&pool, &ctx, "AR-007", dec!(1)).await;

    let cancelled = ctx
        .state
        .receivables
        .cancel(untouched.receivable_id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, ReceivableStatus::Cancelled);

    ctx.state
        .receivables
        .register_payment(paid_down.receivable_id, payment(dec!(10)), ctx.user_id)
        .await
        .unwrap();
    let err = ctx
        .state
        .receivables
        .cancel(paid_down.receivable_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn customer_balance_sums_open_receivables(pool: PgPool) {
    let ctx = setup(&pool).await;
    let a = open_receivable(&pool, &ctx, "AR-008", dec!(2)).await; // 60
    let _b = open_receivable(&pool, &ctx, "AR-009", dec!(1)).await; // 30

    ctx.state
        .receivables
        .register_payment(a.receivable_id, payment(dec!(20)), ctx.user_id)
        .await
        .unwrap();

    let balance = ctx
        .state
        .receivables
        .customer_balance(ctx.customer_id)
        .await
        .unwrap();
    assert_eq!(balance, dec!(70.00));

    // settled and cancelled receivables drop out of the balance
    ctx.state
        .receivables
        .register_payment(a.receivable_id, payment(dec!(40)), ctx.user_id)
        .await
        .unwrap();
    let balance = ctx
        .state
        .receivables
        .customer_balance(ctx.customer_id)
        .await
        .unwrap();
    assert_eq!(balance, dec!(30.00));
}

#[sqlx::test(migrations = "./migrations")]
async fn listing_filters_by_status(pool: PgPool) {
    let ctx = setup(&pool).await;
    let a = open_receivable(&pool, &ctx, "AR-010", dec!(1)).await;
    let _b = open_receivable(&pool, &ctx, "AR-011", dec!(1)).await;

    ctx.state
        .receivables
        .register_payment(a.receivable_id, payment(dec!(30)), ctx.user_id)
        .await
        .unwrap();

    let (open, total) = ctx
        .state
        .receivables
        .list(
            Some(ctx.customer_id),
            Some(ReceivableStatus::Pending),
            None,
            10,
            0,
        )
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(open.len(), 1);

    let (all, total_all) = ctx
        .state
        .receivables
        .list(Some(ctx.customer_id), None, None, 10, 0)
        .await
        .unwrap();
    assert_eq!(total_all, 2);
    assert_eq!(all.len(), 2);
}
