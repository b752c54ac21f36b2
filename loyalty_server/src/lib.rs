//! # Loyalty gateway server
//!
//! The web surface of the loyalty points gateway. It is responsible for:
//! * user registration and login, issuing HMAC-signed bearer tokens;
//! * accepting order number submissions and listing a user's orders;
//! * serving balances, accepting withdrawal requests, and listing withdrawals;
//! * spawning the background reconciliation worker and shutting it down cleanly.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
