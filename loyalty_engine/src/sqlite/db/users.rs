use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{InsertUserResult, StoredCredentials},
    traits::StoreError,
};

pub async fn insert_user(
    login: &str,
    password_hash: &str,
    salt: &str,
    conn: &mut SqliteConnection,
) -> Result<InsertUserResult, StoreError> {
    let result = sqlx::query("INSERT INTO users (login, password_hash, salt) VALUES ($1, $2, $3)")
        .bind(login)
        .bind(password_hash)
        .bind(salt)
        .execute(conn)
        .await;
    match result {
        Ok(_) => {
            debug!("🧑️ User {login} created");
            Ok(InsertUserResult::Created)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(InsertUserResult::LoginTaken),
        Err(e) => Err(e.into()),
    }
}

pub async fn credentials_for_login(
    login: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<StoredCredentials>, sqlx::Error> {
    let credentials = sqlx::query_as("SELECT login, password_hash, salt FROM users WHERE login = $1")
        .bind(login)
        .fetch_optional(conn)
        .await?;
    Ok(credentials)
}
