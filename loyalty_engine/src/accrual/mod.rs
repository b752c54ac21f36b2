//! The typed client for the external accrual authority.
//!
//! The authority is an independently-operated HTTP service that is the sole source of settlement decisions. This
//! module maps its response codes onto the [`FetchOutcome`] vocabulary the reconciliation loop consumes; nothing
//! outside this module ever sees an HTTP status code.
mod client;

pub use client::{AccrualClient, AccrualClientError, AccrualConfig, AccrualSource, FetchOutcome};
