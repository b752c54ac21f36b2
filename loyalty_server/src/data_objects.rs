use lpg_common::Money;
use serde::{Deserialize, Serialize};

/// Body of the register and login requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

/// Body of a withdrawal request: `{"order": "2377225624", "sum": 751}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub order: String,
    pub sum: Money,
}

/// Body of a successful register/login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
