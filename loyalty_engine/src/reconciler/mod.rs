//! The reconciliation loop: the background process that moves orders from "awaiting settlement" to settled, and
//! money from the accrual authority into user ledgers.
//!
//! One cycle polls every unsettled order against the authority, sequentially — the upstream rate limit is shared,
//! so concurrency would only trip it faster. Each order's fetch-and-settle either commits or is entirely retried
//! on a later cycle; a partial failure never aborts the batch, with the single exception of a rate-limit response,
//! which ends the cycle immediately.
//!
//! This loop is the only writer that moves orders out of the unsettled states.
use std::time::Duration;

use log::*;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::{
    accrual::{AccrualSource, FetchOutcome},
    db_types::{OrderNumber, OrderStatus, SettlementApplied, SettlementStatus},
    traits::{LoyaltyDatabase, StoreError},
};

pub struct Reconciler<B, S> {
    db: B,
    source: S,
    interval: Duration,
}

/// What a single cycle did. Mostly interesting to tests and log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleReport {
    /// Orders polled this cycle.
    pub polled: usize,
    /// Orders that reached a terminal status this cycle.
    pub settled: usize,
    /// Minimum back-off requested by the authority, when the cycle was cut short by a rate limit.
    pub backoff: Option<Duration>,
}

impl<B, S> Reconciler<B, S>
where
    B: LoyaltyDatabase,
    S: AccrualSource,
{
    pub fn new(db: B, source: S, interval: Duration) -> Self {
        Self { db, source, interval }
    }

    /// Runs the loop until the shutdown signal flips. Spawn this onto the runtime and keep the sender side of the
    /// signal in a [`ReconcilerHandle`]; the signal is only observed between cycles, so an in-flight cycle always
    /// runs to completion and no settlement is ever left half-applied.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = tokio::time::interval(self.interval);
        // An overrunning cycle delays the next tick instead of letting cycles pile up and overlap
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🔄️ Reconciliation worker started, polling every {:?}", self.interval);
        loop {
            tokio::select! {
                _ = timer.tick() => {},
                _ = shutdown.changed() => break,
            }
            let report = self.run_cycle().await;
            if report.settled > 0 {
                info!("🔄️ Cycle complete: {} of {} polled orders settled", report.settled, report.polled);
            }
            if let Some(backoff) = report.backoff {
                debug!("🔄️ Honoring upstream back-off of {backoff:?}");
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {},
                    _ = shutdown.changed() => break,
                }
            }
            if *shutdown.borrow() {
                break;
            }
        }
        info!("🔄️ Reconciliation worker stopped");
    }

    /// One polling cycle over the current unsettled feed.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        let numbers = match self.db.unsettled_orders().await {
            Ok(numbers) => numbers,
            Err(e) => {
                // Storage trouble is retried on the next tick, never escalated
                error!("🔄️ Could not read the unsettled order feed: {e}");
                return report;
            },
        };
        if numbers.is_empty() {
            return report;
        }
        trace!("🔄️ Polling {} unsettled orders", numbers.len());
        for number in numbers {
            report.polled += 1;
            match self.source.fetch(&number).await {
                FetchOutcome::Settled { status, accrual } => {
                    let accrual = (status == SettlementStatus::Processed).then_some(accrual);
                    match self.db.apply_settlement(&number, status, accrual).await {
                        Ok(SettlementApplied::Applied(_)) => report.settled += 1,
                        Ok(SettlementApplied::AlreadySettled(current)) => {
                            debug!("🔄️ Order {number} was already settled as {current}; settlement replay ignored");
                        },
                        Err(e) => error!("🔄️ Could not apply settlement for {number}: {e}"),
                    }
                },
                FetchOutcome::InProgress => {
                    // Record the authority's acknowledgment; the order stays in the unsettled feed
                    if let Err(e) = self.advance_to_processing(&number).await {
                        error!("🔄️ Could not mark {number} as processing: {e}");
                    }
                },
                FetchOutcome::RateLimited { retry_after } => {
                    warn!(
                        "🔄️ Rate limited by the accrual authority after {} orders; aborting this cycle",
                        report.polled
                    );
                    report.backoff = retry_after;
                    break;
                },
                FetchOutcome::NotFound => {
                    debug!("🔄️ Order {number} is unknown to the accrual authority; leaving it unsettled");
                },
                FetchOutcome::Unavailable(reason) => {
                    warn!("🔄️ Accrual fetch failed for {number}: {reason}. Skipping for this cycle");
                },
            }
        }
        report
    }

    async fn advance_to_processing(&self, number: &OrderNumber) -> Result<(), StoreError> {
        self.db.advance_order(number, OrderStatus::Processing, None).await.map(|_| ())
    }
}

/// The pair feeding a [`Reconciler::run`] call: hand the receiver to `run`, keep the sender in the
/// [`ReconcilerHandle`].
pub fn shutdown_signal() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Control handle for a spawned [`Reconciler`].
pub struct ReconcilerHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ReconcilerHandle {
    pub fn new(shutdown_tx: watch::Sender<bool>, handle: JoinHandle<()>) -> Self {
        Self { shutdown_tx, handle }
    }

    /// Signals the worker to stop and waits for it to finish its in-flight cycle.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            error!("🔄️ Reconciliation worker did not shut down cleanly: {e}");
        }
    }
}
