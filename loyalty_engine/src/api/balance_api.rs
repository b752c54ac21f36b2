use std::fmt::Debug;

use log::debug;
use lpg_common::Money;

use crate::{
    api::BalanceApiError,
    db_types::{Balance, DebitOutcome, OrderNumber, Withdrawal},
    helpers::luhn,
    traits::LoyaltyDatabase,
};

/// Balance reads and the withdrawal flow.
pub struct BalanceApi<B> {
    db: B,
}

impl<B> Debug for BalanceApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BalanceApi")
    }
}

impl<B> BalanceApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> BalanceApi<B>
where B: LoyaltyDatabase
{
    pub async fn balance(&self, login: &str) -> Result<Balance, BalanceApiError> {
        Ok(self.db.fetch_balance(login).await?)
    }

    /// Validates and applies a withdrawal request.
    ///
    /// The cited order number must pass checksum validation, but is otherwise a free-form reference; it is not
    /// required to name an order the user owns, or any stored order at all. Short funds come back as
    /// [`DebitOutcome::InsufficientFunds`] — a normal outcome, not a fault.
    pub async fn withdraw(
        &self,
        login: &str,
        order_number_text: &str,
        amount: Money,
    ) -> Result<DebitOutcome, BalanceApiError> {
        if !amount.is_positive() {
            return Err(BalanceApiError::InvalidAmount);
        }
        if !luhn::is_valid(order_number_text) {
            debug!("💰️ Rejecting withdrawal with malformed order reference for {login}");
            return Err(BalanceApiError::InvalidOrderNumber);
        }
        let number = OrderNumber::from(order_number_text);
        Ok(self.db.debit_balance(login, &number, amount).await?)
    }

    /// All withdrawals recorded for `login`, oldest first. Empty means "none yet".
    pub async fn withdrawals(&self, login: &str) -> Result<Vec<Withdrawal>, BalanceApiError> {
        Ok(self.db.withdrawals_for_user(login).await?)
    }
}
