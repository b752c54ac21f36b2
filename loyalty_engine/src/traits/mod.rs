//! Interface contracts of the loyalty gateway storage backends.
//!
//! The durable store is the single source of truth for orders and balances: the reconciliation loop and the
//! request-handling APIs only ever observe and mutate state through the traits in this module, never through an
//! in-process cache.
//!
//! * [`LoyaltyDatabase`] is the top-level contract a backend must satisfy, including the atomic
//!   settlement operation that keeps order status and ledger credit in one transaction.
//! * [`OrderManagement`] covers the order store: registration, per-user listing, and the unsettled feed the
//!   reconciliation loop consumes.
//! * [`LedgerManagement`] covers the balance ledger: zero-default reads, credits, and the atomic
//!   check-then-debit that records a withdrawal.
//! * [`UserManagement`] covers credential storage for the registration/login flow.
mod ledger_management;
mod loyalty_database;
mod order_management;
mod user_management;

pub use ledger_management::LedgerManagement;
pub use loyalty_database::{LoyaltyDatabase, StoreError};
pub use order_management::OrderManagement;
pub use user_management::UserManagement;
