use thiserror::Error;

use crate::traits::StoreError;

#[derive(Debug, Clone, Error)]
pub enum OrderApiError {
    #[error("The order number failed format validation")]
    InvalidOrderNumber,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Error)]
pub enum BalanceApiError {
    #[error("The order number cited for the withdrawal failed format validation")]
    InvalidOrderNumber,
    #[error("Withdrawal amounts must be positive")]
    InvalidAmount,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Error)]
pub enum AuthApiError {
    #[error("This login is already taken")]
    LoginTaken,
    #[error("Login and password must not be empty")]
    EmptyCredentials,
    #[error("Unknown login or incorrect password")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
}
