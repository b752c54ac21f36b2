use lpg_common::Money;
use thiserror::Error;

use crate::{
    db_types::{OrderNumber, SettlementApplied, SettlementStatus},
    traits::{LedgerManagement, OrderManagement, UserManagement},
};

/// The highest level of behaviour for backends supporting the loyalty gateway.
///
/// Besides the component contracts, a backend must provide [`Self::apply_settlement`], which couples the order
/// status transition and the ledger credit so that a settlement is applied exactly once even when the
/// reconciliation loop re-fetches an order it has already settled.
#[allow(async_fn_in_trait)]
pub trait LoyaltyDatabase: Clone + OrderManagement + LedgerManagement + UserManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Applies a terminal settlement to the order in a single transaction:
    /// * the order status is advanced out of {NEW, PROCESSING} to the given terminal status;
    /// * when the status is `Processed`, the owner's available balance is credited with `accrual`.
    ///
    /// An order that is already in a terminal state is left completely untouched and
    /// [`SettlementApplied::AlreadySettled`] is returned. Unknown order numbers fail with
    /// [`StoreError::OrderNotFound`].
    async fn apply_settlement(
        &self,
        number: &OrderNumber,
        status: SettlementStatus,
        accrual: Option<Money>,
    ) -> Result<SettlementApplied, StoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Internal database error: {0}")]
    Database(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderNumber),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}
