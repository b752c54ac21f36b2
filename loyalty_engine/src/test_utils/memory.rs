use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::Utc;
use lpg_common::Money;

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

/// An in-memory backend satisfying the same contracts as the production SQLite backend.
///
/// Every operation completes under a single mutex acquisition, so per-owner balance mutations are linearizable —
/// which is exactly the property the concurrency tests probe the contract for.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    orders: Vec<Order>,
    balances: HashMap<String, Balance>,
    withdrawals: Vec<Withdrawal>,
    users: HashMap<String, StoredCredentials>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().expect("MemoryStore mutex poisoned")
    }
}

impl OrderManagement for MemoryStore {
    async fn insert_order(&self, login: &str, number: &OrderNumber) -> Result<InsertOrderResult, StoreError> {
        let mut state = self.state();
        if let Some(existing) = state.orders.iter().find(|o| &o.number == number) {
            return if existing.user_login == login {
                Ok(InsertOrderResult::AlreadyOwnedBySelf(existing.clone()))
            } else {
                Ok(InsertOrderResult::AlreadyOwnedByOther)
            };
        }
        let order = Order {
            number: number.clone(),
            user_login: login.to_string(),
            status: OrderStatus::New,
            accrual: None,
            submitted_at: Utc::now(),
        };
        state.orders.push(order.clone());
        Ok(InsertOrderResult::Inserted(order))
    }

    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        Ok(self.state().orders.iter().find(|o| &o.number == number).cloned())
    }

    async fn orders_for_user(&self, login: &str) -> Result<Vec<Order>, StoreError> {
        // Insertion order is submission order
        Ok(self.state().orders.iter().filter(|o| o.user_login == login).cloned().collect())
    }

    async fn unsettled_orders(&self) -> Result<Vec<OrderNumber>, StoreError> {
        Ok(self
            .state()
            .orders
            .iter()
            .filter(|o| o.status.is_unsettled())
            .map(|o| o.number.clone())
            .collect())
    }

    async fn advance_order(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: Option<Money>,
    ) -> Result<SettlementApplied, StoreError> {
        let mut state = self.state();
        let order = state
            .orders
            .iter_mut()
            .find(|o| &o.number == number)
            .ok_or_else(|| StoreError::OrderNotFound(number.clone()))?;
        if order.status.is_terminal() {
            return Ok(SettlementApplied::AlreadySettled(order.status));
        }
        order.status = status;
        if status == OrderStatus::Processed {
            if let Some(amount) = accrual {
                order.accrual = Some(amount);
            }
        }
        Ok(SettlementApplied::Applied(order.clone()))
    }
}

impl LedgerManagement for MemoryStore {
    async fn fetch_balance(&self, login: &str) -> Result<Balance, StoreError> {
        Ok(self.state().balances.get(login).copied().unwrap_or_default())
    }

    async fn credit_balance(&self, login: &str, amount: Money) -> Result<Balance, StoreError> {
        let mut state = self.state();
        let balance = state.balances.entry(login.to_string()).or_default();
        balance.available += amount;
        Ok(*balance)
    }

    async fn debit_balance(
        &self,
        login: &str,
        order_number: &OrderNumber,
        amount: Money,
    ) -> Result<DebitOutcome, StoreError> {
        let mut state = self.state();
        let balance = state.balances.entry(login.to_string()).or_default();
        if balance.available < amount {
            return Ok(DebitOutcome::InsufficientFunds);
        }
        balance.available -= amount;
        balance.withdrawn += amount;
        let withdrawal = Withdrawal {
            order_number: order_number.clone(),
            user_login: login.to_string(),
            amount,
            processed_at: Utc::now(),
        };
        state.withdrawals.push(withdrawal.clone());
        Ok(DebitOutcome::Accepted(withdrawal))
    }

    async fn withdrawals_for_user(&self, login: &str) -> Result<Vec<Withdrawal>, StoreError> {
        Ok(self.state().withdrawals.iter().filter(|w| w.user_login == login).cloned().collect())
    }
}

impl UserManagement for MemoryStore {
    async fn create_user(
        &self,
        login: &str,
        password_hash: &str,
        salt: &str,
    ) -> Result<InsertUserResult, StoreError> {
        let mut state = self.state();
        if state.users.contains_key(login) {
            return Ok(InsertUserResult::LoginTaken);
        }
        state.users.insert(
            login.to_string(),
            StoredCredentials {
                login: login.to_string(),
                password_hash: password_hash.to_string(),
                salt: salt.to_string(),
            },
        );
        Ok(InsertUserResult::Created)
    }

    async fn fetch_credentials(&self, login: &str) -> Result<Option<StoredCredentials>, StoreError> {
        Ok(self.state().users.get(login).cloned())
    }
}

impl LoyaltyDatabase for MemoryStore {
    fn url(&self) -> &str {
        "memory://loyalty"
    }

    async fn apply_settlement(
        &self,
        number: &OrderNumber,
        status: SettlementStatus,
        accrual: Option<Money>,
    ) -> Result<SettlementApplied, StoreError> {
        let mut state = self.state();
        let order = state
            .orders
            .iter_mut()
            .find(|o| &o.number == number)
            .ok_or_else(|| StoreError::OrderNotFound(number.clone()))?;
        if order.status.is_terminal() {
            return Ok(SettlementApplied::AlreadySettled(order.status));
        }
        order.status = status.into();
        let mut credit = None;
        if status == SettlementStatus::Processed {
            let amount = accrual.unwrap_or(Money::ZERO);
            order.accrual = Some(amount);
            if amount.is_positive() {
                credit = Some((order.user_login.clone(), amount));
            }
        }
        let settled = order.clone();
        if let Some((login, amount)) = credit {
            state.balances.entry(login).or_default().available += amount;
        }
        Ok(SettlementApplied::Applied(settled))
    }
}
