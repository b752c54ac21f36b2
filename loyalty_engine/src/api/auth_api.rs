use std::fmt::Debug;

use blake2::{Blake2b512, Digest};
use log::debug;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::{
    api::AuthApiError,
    db_types::InsertUserResult,
    traits::LoyaltyDatabase,
};

const SALT_LEN: usize = 16;

/// Credential registration and verification. The store only ever sees salted digests; plaintext passwords live for
/// the duration of a request and no longer.
pub struct AuthApi<B> {
    db: B,
}

impl<B> Debug for AuthApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthApi")
    }
}

impl<B> AuthApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> AuthApi<B>
where B: LoyaltyDatabase
{
    /// Registers a new user. Taken logins are reported as [`AuthApiError::LoginTaken`].
    pub async fn register(&self, login: &str, password: &str) -> Result<(), AuthApiError> {
        if login.trim().is_empty() || password.is_empty() {
            return Err(AuthApiError::EmptyCredentials);
        }
        let salt: String = thread_rng().sample_iter(&Alphanumeric).take(SALT_LEN).map(char::from).collect();
        let hash = hash_password(password, &salt);
        match self.db.create_user(login, &hash, &salt).await? {
            InsertUserResult::Created => Ok(()),
            InsertUserResult::LoginTaken => {
                debug!("🧑️ Registration rejected: login {login} is taken");
                Err(AuthApiError::LoginTaken)
            },
        }
    }

    /// Checks a login/password pair against the stored credentials. Unknown logins and wrong passwords are
    /// deliberately indistinguishable to the caller.
    pub async fn verify(&self, login: &str, password: &str) -> Result<(), AuthApiError> {
        let credentials = self.db.fetch_credentials(login).await?.ok_or(AuthApiError::InvalidCredentials)?;
        if hash_password(password, &credentials.salt) == credentials.password_hash {
            Ok(())
        } else {
            Err(AuthApiError::InvalidCredentials)
        }
    }
}

fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Blake2b512::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}
