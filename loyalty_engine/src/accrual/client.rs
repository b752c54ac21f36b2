use std::time::Duration;

use log::*;
use lpg_common::Money;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::db_types::{OrderNumber, SettlementStatus};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for the accrual authority, injected at construction. There is no process-wide fallback; the
/// reconciliation loop owns the only client instance.
#[derive(Clone, Debug)]
pub struct AccrualConfig {
    /// Base URL of the authority, e.g. `http://localhost:8082`.
    pub base_url: String,
    /// Per-request timeout, so a hung authority cannot stall a reconciliation cycle indefinitely.
    pub timeout: Duration,
}

impl AccrualConfig {
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), timeout: DEFAULT_REQUEST_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Everything a single settlement query can come back with. Transient trouble is part of the vocabulary rather
/// than an error type, because the reconciliation loop treats every variant as a normal, non-fatal input.
#[derive(Clone, Debug, PartialEq)]
pub enum FetchOutcome {
    /// The authority reached a terminal determination. `accrual` is zero for invalid orders.
    Settled { status: SettlementStatus, accrual: Money },
    /// The authority knows the order but has not settled it yet.
    InProgress,
    /// The authority asked us to back off. `retry_after` is the minimum back-off when the response carried one.
    RateLimited { retry_after: Option<Duration> },
    /// The authority has never heard of this order. Not an error; the order simply stays unsettled.
    NotFound,
    /// The authority failed us this round (5xx, transport error, timeout, or an unreadable body).
    Unavailable(String),
}

/// The seam between the reconciliation loop and the network. Production uses [`AccrualClient`]; tests drive the
/// loop with a scripted source.
#[allow(async_fn_in_trait)]
pub trait AccrualSource {
    async fn fetch(&self, number: &OrderNumber) -> FetchOutcome;
}

#[derive(Debug, Clone, Error)]
pub enum AccrualClientError {
    #[error("Could not initialize the accrual client. {0}")]
    Initialization(String),
}

#[derive(Clone)]
pub struct AccrualClient {
    config: AccrualConfig,
    client: Client,
}

impl AccrualClient {
    pub fn new(config: AccrualConfig) -> Result<Self, AccrualClientError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AccrualClientError::Initialization(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn url_for(&self, number: &OrderNumber) -> String {
        format!("{}/api/orders/{}", self.config.base_url, number.as_str())
    }
}

impl AccrualSource for AccrualClient {
    async fn fetch(&self, number: &OrderNumber) -> FetchOutcome {
        let url = self.url_for(number);
        trace!("📡️ Querying accrual authority: {url}");
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => return FetchOutcome::Unavailable(e.to_string()),
        };
        match response.status() {
            StatusCode::OK => match response.json::<AccrualReply>().await {
                Ok(reply) => reply.into(),
                Err(e) => FetchOutcome::Unavailable(format!("Unreadable accrual response: {e}")),
            },
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);
                FetchOutcome::RateLimited { retry_after }
            },
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => FetchOutcome::NotFound,
            status => FetchOutcome::Unavailable(format!("Accrual authority returned {status}")),
        }
    }
}

//--------------------------------------    Wire format      ---------------------------------------------------------
/// Body of a 200 response: `{"number": "...", "status": "...", "accrual": 500.0}`, with `accrual` present only for
/// processed orders.
#[derive(Debug, Clone, Deserialize)]
struct AccrualReply {
    #[allow(dead_code)]
    number: String,
    status: UpstreamStatus,
    accrual: Option<Money>,
}

/// The authority's own status vocabulary. `Registered` and `Processing` are interim states; only the other two are
/// settlements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum UpstreamStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

impl From<AccrualReply> for FetchOutcome {
    fn from(reply: AccrualReply) -> Self {
        match reply.status {
            // An accrual field on an interim status is meaningless and ignored
            UpstreamStatus::Registered | UpstreamStatus::Processing => FetchOutcome::InProgress,
            UpstreamStatus::Invalid => {
                FetchOutcome::Settled { status: SettlementStatus::Invalid, accrual: Money::ZERO }
            },
            UpstreamStatus::Processed => FetchOutcome::Settled {
                status: SettlementStatus::Processed,
                accrual: reply.accrual.unwrap_or(Money::ZERO),
            },
        }
    }
}
