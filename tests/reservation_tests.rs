mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

use bazaar_backoffice::error::AppError;
use bazaar_backoffice::models::enums::{
    Currency, PaymentMethod, ReservationStatus, SaleStatus, SaleType,
};
use bazaar_backoffice::services::reservation::{
    CreateReservationInput, FulfillReservationInput, ReservationItemInput,
};

use common::{create_product, setup, stock, TestContext};

fn reservation_input(ctx: &TestContext, items: Vec<ReservationItemInput>) -> CreateReservationInput {
    CreateReservationInput {
        customer_id: ctx.customer_id,
        child_id: None,
        list_id: None,
        store_id: ctx.store_id,
        expiration_days: 30,
        deposit_amount: Decimal::ZERO,
        currency: Currency::Ves,
        notes: None,
        items,
    }
}

fn item(product_id: Uuid, quantity: Decimal) -> ReservationItemInput {
    ReservationItemInput {
        product_id,
        quantity,
        unit_price: None,
    }
}

fn fulfill_input() -> FulfillReservationInput {
    FulfillReservationInput {
        payment_method: Some(PaymentMethod::Cash),
        payment_reference: None,
        notes: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn create_moves_available_into_reserved(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "RS-001", dec!(25)).await;
    stock(&ctx, product_id, dec!(5)).await;

    let (reservation, items) = ctx
        .state
        .reservations
        .create(reservation_input(&ctx, vec![item(product_id, dec!(3))]), ctx.user_id)
        .await
        .unwrap();

    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert_eq!(reservation.total_amount, dec!(75.00));
    assert_eq!(reservation.balance, dec!(75.00));
    assert!(reservation.reservation_number.starts_with("RES-"));
    assert!(reservation.reservation_number.ends_with("-0001"));
    assert_eq!(items[0].reserved_quantity, dec!(3));

    let level = ctx
        .state
        .ledger
        .projection_for(product_id, ctx.warehouse_id)
        .await
        .unwrap();
    assert_eq!(level.available_quantity, dec!(2));
    assert_eq!(level.reserved_quantity, dec!(3));
}

#[sqlx::test(migrations = "./migrations")]
async fn reserved_stock_is_not_sellable(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "RS-002", dec!(10)).await;
    stock(&ctx, product_id, dec!(5)).await;

    ctx.state
        .reservations
        .create(reservation_input(&ctx, vec![item(product_id, dec!(4))]), ctx.user_id)
        .await
        .unwrap();

    // only one unit left for everyone else
    let err = ctx
        .state
        .reservations
        .create(reservation_input(&ctx, vec![item(product_id, dec!(2))]), ctx.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));
}

#[sqlx::test(migrations = "./migrations")]
async fn deposit_cannot_exceed_total(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "RS-003", dec!(10)).await;
    stock(&ctx, product_id, dec!(5)).await;

    let mut input = reservation_input(&ctx, vec![item(product_id, dec!(1))]);
    input.deposit_amount = dec!(20);
    let err = ctx
        .state
        .reservations
        .create(input, ctx.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn deposit_reduces_balance(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "RS-004", dec!(40)).await;
    stock(&ctx, product_id, dec!(5)).await;

    let mut input = reservation_input(&ctx, vec![item(product_id, dec!(2))]);
    input.deposit_amount = dec!(30);
    let (reservation, _) = ctx.state.reservations.create(input, ctx.user_id).await.unwrap();
    assert_eq!(reservation.total_amount, dec!(80.00));
    assert_eq!(reservation.deposit_amount, dec!(30));
    assert_eq!(reservation.balance, dec!(50.00));
}

#[sqlx::test(migrations = "./migrations")]
async fn child_must_belong_to_the_customer(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "RS-005", dec!(10)).await;
    stock(&ctx, product_id, dec!(5)).await;

    let mut input = reservation_input(&ctx, vec![item(product_id, dec!(1))]);
    input.child_id = Some(Uuid::new_v4());
    let err = ctx
        .state
        .reservations
        .create(input, ctx.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn confirm_only_from_pending(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "RS-006", dec!(10)).await;
    stock(&ctx, product_id, dec!(5)).await;

    let (reservation, _) = ctx
        .state
        .reservations
        .create(reservation_input(&ctx, vec![item(product_id, dec!(1))]), ctx.user_id)
        .await
        .unwrap();

    let confirmed = ctx
        .state
        .reservations
        .confirm(reservation.reservation_id)
        .await
        .unwrap();
    assert_eq!(confirmed.status, ReservationStatus::Confirmed);

    let err = ctx
        .state
        .reservations
        .confirm(reservation.reservation_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn fulfillment_consumes_each_unit_exactly_once(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "RS-007", dec!(25)).await;
    stock(&ctx, product_id, dec!(5)).await;

    let (reservation, _) = ctx
        .state
        .reservations
        .create(reservation_input(&ctx, vec![item(product_id, dec!(3))]), ctx.user_id)
        .await
        .unwrap();
    ctx.state
        .reservations
        .confirm(reservation.reservation_id)
        .await
        .unwrap();

    let (fulfilled, sale, sale_items) = ctx
        .state
        .reservations
        .fulfill(reservation.reservation_id, fulfill_input(), ctx.user_id)
        .await
        .unwrap();

    assert_eq!(fulfilled.status, ReservationStatus::Fulfilled);
    assert!(fulfilled.fulfilled_at.is_some());
    assert_eq!(fulfilled.fulfilled_by, Some(ctx.user_id));
    assert_eq!(sale.sale_type, SaleType::Reservation);
    assert_eq!(sale.status, SaleStatus::Completed);
    assert_eq!(sale.reservation_id, Some(reservation.reservation_id));
    assert_eq!(sale.total_amount, reservation.total_amount);
    assert_eq!(sale_items[0].unit_price, dec!(25));

    // 5 in, 3 reserved then sold: 2 available, nothing still reserved
    let level = ctx
        .state
        .ledger
        .projection_for(product_id, ctx.warehouse_id)
        .await
        .unwrap();
    assert_eq!(level.available_quantity, dec!(2));
    assert_eq!(level.reserved_quantity, Decimal::ZERO);

    let (_, items) = ctx
        .state
        .reservations
        .get(reservation.reservation_id)
        .await
        .unwrap();
    assert!(items[0].is_fulfilled);
    assert_eq!(items[0].fulfilled_quantity, dec!(3));
    assert_eq!(items[0].reserved_quantity, Decimal::ZERO);
}

#[sqlx::test(migrations = "./migrations")]
async fn fulfillment_uses_snapshot_prices(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "RS-008", dec!(25)).await;
    stock(&ctx, product_id, dec!(5)).await;

    let (reservation, _) = ctx
        .state
        .reservations
        .create(reservation_input(&ctx, vec![item(product_id, dec!(2))]), ctx.user_id)
        .await
        .unwrap();
    ctx.state
        .reservations
        .confirm(reservation.reservation_id)
        .await
        .unwrap();

    // a later price change must not affect the reserved deal
    sqlx::query("UPDATE products SET selling_price = 99 WHERE product_id = $1")
        .bind(product_id)
        .execute(&pool)
        .await
        .unwrap();

    let (_, sale, sale_items) = ctx
        .state
        .reservations
        .fulfill(reservation.reservation_id, fulfill_input(), ctx.user_id)
        .await
        .unwrap();
    assert_eq!(sale_items[0].unit_price, dec!(25));
    assert_eq!(sale.total_amount, dec!(50.00));
}

#[sqlx::test(migrations = "./migrations")]
async fn fulfill_requires_confirmed(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "RS-009", dec!(10)).await;
    stock(&ctx, product_id, dec!(5)).await;

    let (reservation, _) = ctx
        .state
        .reservations
        .create(reservation_input(&ctx, vec![item(product_id, dec!(1))]), ctx.user_id)
        .await
        .unwrap();

    let err = ctx
        .state
        .reservations
        .fulfill(reservation.reservation_id, fulfill_input(), ctx.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn cancel_returns_held_stock(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "RS-010", dec!(10)).await;
    stock(&ctx, product_id, dec!(5)).await;

    let (reservation, _) = ctx
        .state
        .reservations
        .create(reservation_input(&ctx, vec![item(product_id, dec!(4))]), ctx.user_id)
        .await
        .unwrap();

    let cancelled = ctx
        .state
        .reservations
        .cancel(
            reservation.reservation_id,
            Some("Changed their mind".into()),
            Some(ctx.user_id),
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);

    let level = ctx
        .state
        .ledger
        .projection_for(product_id, ctx.warehouse_id)
        .await
        .unwrap();
    assert_eq!(level.available_quantity, dec!(5));
    assert_eq!(level.reserved_quantity, Decimal::ZERO);

    // a fulfilled-or-closed reservation cannot be cancelled again
    let err = ctx
        .state
        .reservations
        .cancel(reservation.reservation_id, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn expire_sweep_closes_overdue_reservations(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "RS-011", dec!(10)).await;
    stock(&ctx, product_id, dec!(6)).await;

    let (overdue, _) = ctx
        .state
        .reservations
        .create(reservation_input(&ctx, vec![item(product_id, dec!(2))]), ctx.user_id)
        .await
        .unwrap();
    let (current, _) = ctx
        .state
        .reservations
        .create(reservation_input(&ctx, vec![item(product_id, dec!(1))]), ctx.user_id)
        .await
        .unwrap();

    sqlx::query(
        "UPDATE reservations SET expiration_date = now() - interval '1 day' WHERE reservation_id = $1",
    )
    .bind(overdue.reservation_id)
    .execute(&pool)
    .await
    .unwrap();

    let expired = ctx.state.reservations.expire_sweep().await.unwrap();
    assert_eq!(expired, 1);

    let (reloaded, _) = ctx.state.reservations.get(overdue.reservation_id).await.unwrap();
    assert_eq!(reloaded.status, ReservationStatus::Expired);
    let (untouched, _) = ctx.state.reservations.get(current.reservation_id).await.unwrap();
    assert_eq!(untouched.status, ReservationStatus::Pending);

    // only the expired hold returned to the shelf
    let level = ctx
        .state
        .ledger
        .projection_for(product_id, ctx.warehouse_id)
        .await
        .unwrap();
    assert_eq!(level.available_quantity, dec!(5));
    assert_eq!(level.reserved_quantity, dec!(1));
}

#[sqlx::test(migrations = "./migrations")]
async fn reminders_are_stamped_once_per_day(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "RS-012", dec!(10)).await;
    stock(&ctx, product_id, dec!(5)).await;

    let (reservation, _) = ctx
        .state
        .reservations
        .create(reservation_input(&ctx, vec![item(product_id, dec!(1))]), ctx.user_id)
        .await
        .unwrap();
    sqlx::query(
        "UPDATE reservations SET expiration_date = now() + interval '24 hours' WHERE reservation_id = $1",
    )
    .bind(reservation.reservation_id)
    .execute(&pool)
    .await
    .unwrap();

    let sent = ctx.state.reservations.send_reminders(48).await.unwrap();
    assert_eq!(sent, 1);

    let (reloaded, _) = ctx.state.reservations.get(reservation.reservation_id).await.unwrap();
    assert!(reloaded.reminder_sent_at.is_some());

    // already reminded within 24h: nothing to do
    let sent = ctx.state.reservations.send_reminders(48).await.unwrap();
    assert_eq!(sent, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn lookup_by_number_matches_lookup_by_id(pool: PgPool) {
    let ctx = setup(&pool).await;
    let product_id = create_product(&pool, "RS-013", dec!(9)).await;
    stock(&ctx, product_id, dec!(5)).await;

    let (created, _) = ctx
        .state
        .reservations
        .create(reservation_input(&ctx, vec![item(product_id, dec!(2))]), ctx.user_id)
        .await
        .unwrap();

    let (by_number, items) = ctx
        .state
        .reservations
        .get_by_number(&created.reservation_number)
        .await
        .unwrap();
    assert_eq!(by_number.reservation_id, created.reservation_id);
    assert_eq!(items.len(), 1);

    let err = ctx
        .state
        .reservations
        .get_by_number("RES-1999-01-0001")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
