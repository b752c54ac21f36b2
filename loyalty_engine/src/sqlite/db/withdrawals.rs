use chrono::{DateTime, Utc};
use lpg_common::Money;
use sqlx::SqliteConnection;

use crate::db_types::{OrderNumber, Withdrawal};

/// Records a single immutable withdrawal entry. Callers pair this with [`super::balances::guarded_debit`] inside
/// one transaction so the entry and its ledger debit commit together.
pub async fn insert_withdrawal(
    login: &str,
    order_number: &OrderNumber,
    amount: Money,
    processed_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Withdrawal, sqlx::Error> {
    let withdrawal = sqlx::query_as(
        r#"
            INSERT INTO withdrawals (user_login, order_number, amount, processed_at)
            VALUES ($1, $2, $3, $4)
            RETURNING order_number, user_login, amount, processed_at;
        "#,
    )
    .bind(login)
    .bind(order_number.as_str())
    .bind(amount)
    .bind(processed_at)
    .fetch_one(conn)
    .await?;
    Ok(withdrawal)
}

/// All withdrawals for the login, oldest first.
pub async fn withdrawals_for_user(login: &str, conn: &mut SqliteConnection) -> Result<Vec<Withdrawal>, sqlx::Error> {
    let withdrawals = sqlx::query_as(
        r#"
            SELECT order_number, user_login, amount, processed_at
            FROM withdrawals
            WHERE user_login = $1
            ORDER BY processed_at ASC
        "#,
    )
    .bind(login)
    .fetch_all(conn)
    .await?;
    Ok(withdrawals)
}
