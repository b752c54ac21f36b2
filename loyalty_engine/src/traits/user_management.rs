use crate::{
    db_types::{InsertUserResult, StoredCredentials},
    traits::StoreError,
};

/// Contract for credential storage. Password hashing happens in [`crate::AuthApi`]; the store only ever sees the
/// salted hash.
#[allow(async_fn_in_trait)]
pub trait UserManagement {
    /// Creates a user record. Logins are unique; a taken login reports [`InsertUserResult::LoginTaken`].
    async fn create_user(&self, login: &str, password_hash: &str, salt: &str)
        -> Result<InsertUserResult, StoreError>;

    /// Fetches the stored credentials for `login`, or `None` if the user does not exist.
    async fn fetch_credentials(&self, login: &str) -> Result<Option<StoredCredentials>, StoreError>;
}
