use std::fmt::Debug;

use log::debug;

use crate::{
    api::OrderApiError,
    db_types::{InsertOrderResult, Order, OrderNumber},
    helpers::luhn,
    traits::LoyaltyDatabase,
};

/// Order submission and listing on behalf of an authenticated user.
pub struct OrderApi<B> {
    db: B,
}

impl<B> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi")
    }
}

impl<B> OrderApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderApi<B>
where B: LoyaltyDatabase
{
    /// Validates the order number format and registers it for `login`.
    ///
    /// Resubmission of a number the user already owns is an idempotent success; a number owned by anyone else is a
    /// permanent conflict. Both are carried in the [`InsertOrderResult`], not as errors.
    pub async fn submit_order(&self, login: &str, number_text: &str) -> Result<InsertOrderResult, OrderApiError> {
        if !luhn::is_valid(number_text) {
            debug!("📝️ Rejecting order submission with malformed number for {login}");
            return Err(OrderApiError::InvalidOrderNumber);
        }
        let number = OrderNumber::from(number_text);
        Ok(self.db.insert_order(login, &number).await?)
    }

    /// All orders submitted by `login`, oldest first. Empty means "no orders yet".
    pub async fn orders(&self, login: &str) -> Result<Vec<Order>, OrderApiError> {
        Ok(self.db.orders_for_user(login).await?)
    }
}
