//! Loyalty Engine
//!
//! The core of the loyalty points gateway: users submit order numbers, an external accrual authority settles them,
//! and settled accruals land in a per-user balance ledger that also pays out withdrawals.
//!
//! The library is divided into four main sections:
//! 1. Storage ([`mod@traits`] and the SQLite backend). The durable store is the single source of truth for orders
//!    and balances; backends implement the traits in [`mod@traits`], and everything else goes through them. The
//!    data types used in storage are defined in [`mod@db_types`] and are public.
//! 2. The accrual client ([`mod@accrual`]), a typed view of the external settlement authority.
//! 3. The reconciliation loop ([`Reconciler`]), the background worker that polls unsettled orders and applies
//!    settlements atomically against the order store and the ledger.
//! 4. The public API ([`OrderApi`], [`BalanceApi`], [`AuthApi`]) the web-facing layer is built on.
pub mod accrual;
mod api;
pub mod db_types;
pub mod helpers;
mod reconciler;
mod sqlite;
pub mod traits;

#[cfg(feature = "test_utils")]
pub mod test_utils;

pub use api::{AuthApi, AuthApiError, BalanceApi, BalanceApiError, OrderApi, OrderApiError};
pub use reconciler::{shutdown_signal, CycleReport, Reconciler, ReconcilerHandle};
pub use sqlite::SqliteDatabase;
