use chrono::Utc;
use log::debug;
use lpg_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::{InsertOrderResult, Order, OrderNumber, OrderStatus, SettlementApplied},
    traits::StoreError,
};

/// Registers the order for the given login, returning ownership information if the number is already taken.
///
/// The uniqueness of the number is ultimately enforced by the primary key, so two racing submissions of the same
/// number resolve to exactly one insert; the loser is classified against the committed row.
pub async fn insert_order(
    login: &str,
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<InsertOrderResult, StoreError> {
    if let Some(existing) = fetch_order_by_number(number, &mut *conn).await? {
        return Ok(classify_existing(login, existing));
    }
    let inserted = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (number, user_login, submitted_at)
            VALUES ($1, $2, $3)
            RETURNING number, user_login, status, accrual, submitted_at;
        "#,
    )
    .bind(number.as_str())
    .bind(login)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await;
    match inserted {
        Ok(order) => {
            debug!("📝️ Order {} registered for {login}", order.number);
            Ok(InsertOrderResult::Inserted(order))
        },
        // Lost the race to another submission of the same number
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            let existing = fetch_order_by_number(number, conn)
                .await?
                .ok_or_else(|| StoreError::Database("Order vanished after unique violation".to_string()))?;
            Ok(classify_existing(login, existing))
        },
        Err(e) => Err(e.into()),
    }
}

fn classify_existing(login: &str, existing: Order) -> InsertOrderResult {
    if existing.user_login == login {
        InsertOrderResult::AlreadyOwnedBySelf(existing)
    } else {
        InsertOrderResult::AlreadyOwnedByOther
    }
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        "SELECT number, user_login, status, accrual, submitted_at FROM orders WHERE number = $1",
    )
    .bind(number.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// All orders for the login, oldest submission first.
pub async fn orders_for_user(login: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
            SELECT number, user_login, status, accrual, submitted_at
            FROM orders
            WHERE user_login = $1
            ORDER BY submitted_at ASC
        "#,
    )
    .bind(login)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// The polling feed for the reconciliation loop: numbers of all orders that have not reached a terminal status,
/// oldest first.
pub async fn unsettled_orders(conn: &mut SqliteConnection) -> Result<Vec<OrderNumber>, sqlx::Error> {
    let numbers = sqlx::query_scalar::<_, String>(
        r#"
            SELECT number FROM orders
            WHERE status IN ('NEW', 'PROCESSING')
            ORDER BY submitted_at ASC
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(numbers.into_iter().map(OrderNumber::from).collect())
}

/// Guarded forward transition of the order status.
///
/// The WHERE clause is the invariant: only orders still awaiting settlement can change, so terminal states are
/// immutable no matter how often a settlement is replayed. `accrual` is persisted only when the new status is
/// `PROCESSED`.
pub async fn advance_order(
    number: &OrderNumber,
    status: OrderStatus,
    accrual: Option<Money>,
    conn: &mut SqliteConnection,
) -> Result<SettlementApplied, StoreError> {
    let accrual = if status == OrderStatus::Processed { accrual } else { None };
    let updated: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = $1, accrual = COALESCE($2, accrual)
            WHERE number = $3 AND status IN ('NEW', 'PROCESSING')
            RETURNING number, user_login, status, accrual, submitted_at;
        "#,
    )
    .bind(status)
    .bind(accrual)
    .bind(number.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(order) => Ok(SettlementApplied::Applied(order)),
        None => match fetch_order_by_number(number, conn).await? {
            Some(order) => Ok(SettlementApplied::AlreadySettled(order.status)),
            None => Err(StoreError::OrderNotFound(number.clone())),
        },
    }
}
