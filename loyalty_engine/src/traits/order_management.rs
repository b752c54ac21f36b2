use lpg_common::Money;

use crate::{
    db_types::{InsertOrderResult, Order, OrderNumber, OrderStatus, SettlementApplied},
    traits::StoreError,
};

/// Contract for the order store: the durable record of orders, their status and accrual amount, keyed by order
/// number. Order numbers are unique across the whole system, not per user.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Registers `number` for `login`.
    ///
    /// The first user to register a number owns it for its entire lifetime. Resubmission by the owner reports
    /// [`InsertOrderResult::AlreadyOwnedBySelf`], which callers treat as a non-error; a submission by anyone else
    /// reports [`InsertOrderResult::AlreadyOwnedByOther`].
    async fn insert_order(&self, login: &str, number: &OrderNumber) -> Result<InsertOrderResult, StoreError>;

    /// Fetches a single order by number.
    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError>;

    /// All orders submitted by `login`, ordered by submission time, oldest first. An empty vec is the "no orders"
    /// signal.
    async fn orders_for_user(&self, login: &str) -> Result<Vec<Order>, StoreError>;

    /// The numbers of all orders still awaiting settlement (status NEW or PROCESSING), oldest first. This is the
    /// feed the reconciliation loop polls; it always reflects current durable state.
    async fn unsettled_orders(&self) -> Result<Vec<OrderNumber>, StoreError>;

    /// Advances the order's status. The transition is guarded: terminal orders are never modified and
    /// [`SettlementApplied::AlreadySettled`] is reported instead. `accrual` only has effect when the new status is
    /// [`OrderStatus::Processed`]. Unknown numbers fail with [`StoreError::OrderNotFound`].
    ///
    /// Note that advancing to `Processed` through this method does NOT credit the ledger; the reconciliation loop
    /// uses [`crate::traits::LoyaltyDatabase::apply_settlement`] for that.
    async fn advance_order(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: Option<Money>,
    ) -> Result<SettlementApplied, StoreError>;
}
