use std::env;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

/// Prepares a pristine test environment: logging, and a freshly created (empty) database file at `url`.
/// Migrations run when the test opens the database through `SqliteDatabase::new_with_url`.
pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
}

/// A unique database URL under the system temp directory.
pub fn random_db_path() -> String {
    format!("sqlite://{}/loyalty_test_{}.db", env::temp_dir().display(), rand::random::<u64>())
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}
