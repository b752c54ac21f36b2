use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use lpg_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------    OrderNumber      ---------------------------------------------------------
/// A lightweight wrapper around the order number string.
///
/// Order numbers are opaque identifiers minted outside this system. They are digits-only and Luhn-checked at the
/// edges, but may legitimately exceed the range of any integer type, so they are carried as strings throughout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    OrderStatus      ---------------------------------------------------------
/// The settlement state of a submitted order.
///
/// Status only moves forward: `New → Processing → {Processed, Invalid}`. The two terminal states never change again;
/// the guarded UPDATE in the sqlite backend enforces this at the storage level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Submitted, not yet seen by the accrual authority.
    New,
    /// The accrual authority has acknowledged the order but has not settled it.
    Processing,
    /// Settled with an accrual amount.
    Processed,
    /// Settled; the order does not qualify for accrual.
    Invalid,
}

impl OrderStatus {
    /// True for orders the reconciliation loop still needs to poll.
    pub fn is_unsettled(&self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_unsettled()
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::New => write!(f, "NEW"),
            OrderStatus::Processing => write!(f, "PROCESSING"),
            OrderStatus::Processed => write!(f, "PROCESSED"),
            OrderStatus::Invalid => write!(f, "INVALID"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct StatusConversionError(String);

impl FromStr for OrderStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "PROCESSED" => Ok(Self::Processed),
            "INVALID" => Ok(Self::Invalid),
            s => Err(StatusConversionError(s.to_string())),
        }
    }
}

//--------------------------------------  SettlementStatus   ---------------------------------------------------------
/// A terminal determination by the accrual authority. The only two values the reconciliation loop may settle an
/// order with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementStatus {
    Processed,
    Invalid,
}

impl From<SettlementStatus> for OrderStatus {
    fn from(value: SettlementStatus) -> Self {
        match value {
            SettlementStatus::Processed => OrderStatus::Processed,
            SettlementStatus::Invalid => OrderStatus::Invalid,
        }
    }
}

impl Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        OrderStatus::from(*self).fmt(f)
    }
}

//--------------------------------------       Order         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub number: OrderNumber,
    #[serde(skip)]
    pub user_login: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Money>,
    pub submitted_at: DateTime<Utc>,
}

//--------------------------------------      Balance        ---------------------------------------------------------
/// A user's ledger totals. Users without a ledger row read as all zeroes; the row is materialized on first credit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct Balance {
    pub available: Money,
    pub withdrawn: Money,
}

//--------------------------------------     Withdrawal      ---------------------------------------------------------
/// A single ledger debit. Immutable once recorded; the `order_number` is a free-form reference supplied by the user
/// and is not required to match an order they own.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Withdrawal {
    pub order_number: OrderNumber,
    #[serde(skip)]
    pub user_login: String,
    pub amount: Money,
    pub processed_at: DateTime<Utc>,
}

//--------------------------------------  StoredCredentials  ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct StoredCredentials {
    pub login: String,
    pub password_hash: String,
    pub salt: String,
}

//--------------------------------------  Operation results  ---------------------------------------------------------
/// Result of trying to register an order number for a user. Number ownership is first-writer-wins and permanent, so
/// a resubmission by the owner is an idempotent success, while anyone else hits a conflict forever.
#[derive(Debug, Clone)]
pub enum InsertOrderResult {
    Inserted(Order),
    AlreadyOwnedBySelf(Order),
    AlreadyOwnedByOther,
}

/// Result of an attempted ledger debit. Short funds are a normal outcome, not a fault.
#[derive(Debug, Clone)]
pub enum DebitOutcome {
    Accepted(Withdrawal),
    InsufficientFunds,
}

/// Result of applying a settlement to an order. `AlreadySettled` means the order was in a terminal state before the
/// call; the ledger is guaranteed untouched in that case, which is what makes settlement replay safe.
#[derive(Debug, Clone)]
pub enum SettlementApplied {
    Applied(Order),
    AlreadySettled(OrderStatus),
}

/// Result of creating a user record.
#[derive(Debug, Clone)]
pub enum InsertUserResult {
    Created,
    LoginTaken,
}
