//! The public-facing API of the loyalty engine.
//!
//! These are thin façades over a [`crate::traits::LoyaltyDatabase`] backend: they add the validation the web layer
//! relies on (checksum format, positive amounts, credential hashing) and nothing else. Specific backends need only
//! implement the storage traits to be served through them.
mod auth_api;
mod balance_api;
mod errors;
mod order_api;

pub use auth_api::AuthApi;
pub use balance_api::BalanceApi;
pub use errors::{AuthApiError, BalanceApiError, OrderApiError};
pub use order_api::OrderApi;
