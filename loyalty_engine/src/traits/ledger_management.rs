use lpg_common::Money;

use crate::{
    db_types::{Balance, DebitOutcome, OrderNumber, Withdrawal},
    traits::StoreError,
};

/// Contract for the balance ledger: each user's available and withdrawn totals.
///
/// Invariants the backend must uphold under concurrent access:
/// * `available` never goes negative;
/// * `withdrawn` never decreases;
/// * the check-then-mutate of a debit is atomic with respect to concurrent credits and debits on the same login.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    /// The ledger totals for `login`. Users without a ledger row read as a zero-valued balance; this is lazy
    /// materialization, not an error.
    async fn fetch_balance(&self, login: &str) -> Result<Balance, StoreError>;

    /// Increases `login`'s available balance by `amount` (`amount >= 0`), materializing the ledger row if needed.
    /// Returns the updated balance. Idempotency is the caller's responsibility; the settlement transaction in
    /// [`crate::traits::LoyaltyDatabase::apply_settlement`] is what prevents double credits.
    async fn credit_balance(&self, login: &str, amount: Money) -> Result<Balance, StoreError>;

    /// Atomically checks `available >= amount`, and if so decreases `available`, increases `withdrawn`, and records
    /// a [`Withdrawal`] row citing `order_number`, all in one transaction. Otherwise reports
    /// [`DebitOutcome::InsufficientFunds`] and mutates nothing.
    async fn debit_balance(
        &self,
        login: &str,
        order_number: &OrderNumber,
        amount: Money,
    ) -> Result<DebitOutcome, StoreError>;

    /// All withdrawals recorded for `login`, ordered by processing time, oldest first.
    async fn withdrawals_for_user(&self, login: &str) -> Result<Vec<Withdrawal>, StoreError>;
}
