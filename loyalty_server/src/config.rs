use std::{env, time::Duration};

use chrono::Duration as ChronoDuration;
use log::*;
use loyalty_engine::accrual::AccrualConfig;
use lpg_common::Secret;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

const DEFAULT_RUN_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_DATABASE_URL: &str = "sqlite://data/loyalty.db";
const DEFAULT_ACCRUAL_ADDRESS: &str = "http://127.0.0.1:8082";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_ACCRUAL_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_TOKEN_TTL_HOURS: i64 = 3;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// The `host:port` pair the HTTP server binds to.
    pub run_address: String,
    pub database_url: String,
    /// Connection settings for the external accrual authority.
    pub accrual: AccrualConfig,
    /// How often the reconciliation worker polls the unsettled order feed.
    pub poll_interval: Duration,
    pub auth: AuthConfig,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Key for signing bearer tokens.
    pub hmac_secret: Secret<String>,
    /// How long an issued token stays valid.
    pub token_ttl: ChronoDuration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { hmac_secret: Secret::new(random_secret()), token_ttl: ChronoDuration::hours(DEFAULT_TOKEN_TTL_HOURS) }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            run_address: DEFAULT_RUN_ADDRESS.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            accrual: AccrualConfig::new(DEFAULT_ACCRUAL_ADDRESS),
            poll_interval: DEFAULT_POLL_INTERVAL,
            auth: AuthConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let run_address = env::var("RUN_ADDRESS").ok().unwrap_or_else(|| DEFAULT_RUN_ADDRESS.into());
        let database_url = env::var("DATABASE_URL").or_else(|_| env::var("DATABASE_URI")).unwrap_or_else(|_| {
            warn!("🪛️ DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.into()
        });
        let accrual_address = env::var("ACCRUAL_SYSTEM_ADDRESS").unwrap_or_else(|_| {
            warn!(
                "🪛️ ACCRUAL_SYSTEM_ADDRESS is not set. Using the default, {DEFAULT_ACCRUAL_ADDRESS}. No orders \
                 will settle unless an accrual authority is listening there."
            );
            DEFAULT_ACCRUAL_ADDRESS.into()
        });
        let accrual_timeout = duration_from_env("LOYALTY_ACCRUAL_TIMEOUT", DEFAULT_ACCRUAL_TIMEOUT);
        let poll_interval = duration_from_env("LOYALTY_POLL_INTERVAL", DEFAULT_POLL_INTERVAL);
        let accrual = AccrualConfig::new(&accrual_address).with_timeout(accrual_timeout);
        let auth = AuthConfig::from_env_or_default();
        Self { run_address, database_url, accrual, poll_interval, auth }
    }
}

impl AuthConfig {
    pub fn from_env_or_default() -> Self {
        let hmac_secret = env::var("LOYALTY_JWT_SECRET").map(Secret::new).unwrap_or_else(|_| {
            warn!("🪛️ LOYALTY_JWT_SECRET is not set. Using a random secret; tokens will not survive a restart.");
            Secret::new(random_secret())
        });
        let token_ttl = env::var("LOYALTY_TOKEN_TTL")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(ChronoDuration::hours)
            .unwrap_or_else(|| ChronoDuration::hours(DEFAULT_TOKEN_TTL_HOURS));
        Self { hmac_secret, token_ttl }
    }
}

fn duration_from_env(var: &str, default: Duration) -> Duration {
    match env::var(var) {
        Ok(s) => s.parse::<u64>().map(Duration::from_secs).unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid number of seconds for {var}. {e} Using the default, {default:?}, instead.");
            default
        }),
        Err(_) => default,
    }
}

fn random_secret() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect()
}
