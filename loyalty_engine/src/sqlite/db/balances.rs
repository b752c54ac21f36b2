use log::trace;
use lpg_common::Money;
use sqlx::SqliteConnection;

use crate::{db_types::Balance, traits::StoreError};

/// The ledger totals for the login. Absent rows read as zeroes; the row is only materialized by the first credit.
pub async fn fetch_balance(login: &str, conn: &mut SqliteConnection) -> Result<Balance, sqlx::Error> {
    let balance: Option<Balance> =
        sqlx::query_as("SELECT available, withdrawn FROM balances WHERE user_login = $1")
            .bind(login)
            .fetch_optional(conn)
            .await?;
    Ok(balance.unwrap_or_default())
}

/// Upserts a credit into the ledger and returns the updated totals.
pub async fn credit_balance(login: &str, amount: Money, conn: &mut SqliteConnection) -> Result<Balance, StoreError> {
    let balance = sqlx::query_as(
        r#"
            INSERT INTO balances (user_login, available, withdrawn) VALUES ($1, $2, 0)
            ON CONFLICT (user_login)
            DO UPDATE SET available = available + excluded.available, updated_at = CURRENT_TIMESTAMP
            RETURNING available, withdrawn;
        "#,
    )
    .bind(login)
    .bind(amount)
    .fetch_one(conn)
    .await?;
    trace!("💰️ Credited {amount} to {login}");
    Ok(balance)
}

/// The check-then-debit, collapsed into a single guarded UPDATE so concurrent debits on one login cannot
/// interleave their read and write phases. Returns `false` (and mutates nothing) when funds are short, which also
/// covers logins with no ledger row at all.
pub async fn guarded_debit(login: &str, amount: Money, conn: &mut SqliteConnection) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
            UPDATE balances
            SET available = available - $1, withdrawn = withdrawn + $1, updated_at = CURRENT_TIMESTAMP
            WHERE user_login = $2 AND available >= $1;
        "#,
    )
    .bind(amount)
    .bind(login)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
