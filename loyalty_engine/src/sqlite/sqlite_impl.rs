use std::fmt::Debug;

use chrono::Utc;
use log::*;
use lpg_common::Money;
use sqlx::SqlitePool;

use super::db::{balances, new_pool, orders, users, withdrawals};
use crate::{
    db_types::{
        Balance,
        DebitOutcome,
        InsertOrderResult,
        InsertUserResult,
        Order,
        OrderNumber,
        OrderStatus,
        SettlementApplied,
        SettlementStatus,
        StoredCredentials,
        Withdrawal,
    },
    traits::{LedgerManagement, LoyaltyDatabase, OrderManagement, StoreError, UserManagement},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `url`, creating the file if needed, and brings the schema up to date with the
    /// embedded migrations.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = new_pool(url, max_connections).await?;
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        debug!("🗃️ Connected to database at {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, login: &str, number: &OrderNumber) -> Result<InsertOrderResult, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(login, number, &mut conn).await
    }

    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_number(number, &mut conn).await?)
    }

    async fn orders_for_user(&self, login: &str) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::orders_for_user(login, &mut conn).await?)
    }

    async fn unsettled_orders(&self) -> Result<Vec<OrderNumber>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::unsettled_orders(&mut conn).await?)
    }

    async fn advance_order(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: Option<Money>,
    ) -> Result<SettlementApplied, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::advance_order(number, status, accrual, &mut conn).await
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn fetch_balance(&self, login: &str) -> Result<Balance, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(balances::fetch_balance(login, &mut conn).await?)
    }

    async fn credit_balance(&self, login: &str, amount: Money) -> Result<Balance, StoreError> {
        let mut conn = self.pool.acquire().await?;
        balances::credit_balance(login, amount, &mut conn).await
    }

    /// The debit and its withdrawal entry commit in one transaction; if funds are short nothing is written.
    async fn debit_balance(
        &self,
        login: &str,
        order_number: &OrderNumber,
        amount: Money,
    ) -> Result<DebitOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        if !balances::guarded_debit(login, amount, &mut tx).await? {
            debug!("💰️ Debit of {amount} rejected for {login}: insufficient funds");
            return Ok(DebitOutcome::InsufficientFunds);
        }
        let withdrawal = withdrawals::insert_withdrawal(login, order_number, amount, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        debug!("💰️ {login} withdrew {amount} against {order_number}");
        Ok(DebitOutcome::Accepted(withdrawal))
    }

    async fn withdrawals_for_user(&self, login: &str) -> Result<Vec<Withdrawal>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(withdrawals::withdrawals_for_user(login, &mut conn).await?)
    }
}

impl UserManagement for SqliteDatabase {
    async fn create_user(
        &self,
        login: &str,
        password_hash: &str,
        salt: &str,
    ) -> Result<InsertUserResult, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::insert_user(login, password_hash, salt, &mut conn).await
    }

    async fn fetch_credentials(&self, login: &str) -> Result<Option<StoredCredentials>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::credentials_for_login(login, &mut conn).await?)
    }
}

impl LoyaltyDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Status advance and ledger credit happen in a single transaction. The guarded UPDATE inside
    /// [`orders::advance_order`] only matches orders that are still unsettled, so a replayed settlement takes the
    /// `AlreadySettled` branch and the credit never runs twice.
    async fn apply_settlement(
        &self,
        number: &OrderNumber,
        status: SettlementStatus,
        accrual: Option<Money>,
    ) -> Result<SettlementApplied, StoreError> {
        let mut tx = self.pool.begin().await?;
        let applied = orders::advance_order(number, status.into(), accrual, &mut tx).await?;
        if let SettlementApplied::Applied(order) = &applied {
            if status == SettlementStatus::Processed {
                let amount = order.accrual.unwrap_or(Money::ZERO);
                if amount.is_positive() {
                    balances::credit_balance(&order.user_login, amount, &mut tx).await?;
                }
                info!("🔄️ Order {} settled with accrual {amount} for {}", order.number, order.user_login);
            } else {
                info!("🔄️ Order {} settled as INVALID", order.number);
            }
        }
        tx.commit().await?;
        Ok(applied)
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}
