use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use loyalty_engine::{
    accrual::{AccrualSource, FetchOutcome},
    db_types::{OrderNumber, OrderStatus, SettlementStatus},
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        MemoryStore,
    },
    traits::{LedgerManagement, LoyaltyDatabase, OrderManagement},
    AuthApi,
    OrderApi,
    Reconciler,
    ReconcilerHandle,
    SqliteDatabase,
};
use lpg_common::Money;

const CYCLE: Duration = Duration::from_millis(50);

/// An accrual authority with a fixed answer per order number. Unscripted numbers are unknown.
#[derive(Clone, Default)]
struct ScriptedAuthority {
    outcomes: Arc<Mutex<HashMap<String, FetchOutcome>>>,
}

impl ScriptedAuthority {
    fn script(&self, number: &str, outcome: FetchOutcome) {
        self.outcomes.lock().unwrap().insert(number.to_string(), outcome);
    }

    fn processed(&self, number: &str, points: i64) {
        self.script(
            number,
            FetchOutcome::Settled { status: SettlementStatus::Processed, accrual: Money::from_points(points) },
        );
    }
}

impl AccrualSource for ScriptedAuthority {
    async fn fetch(&self, number: &OrderNumber) -> FetchOutcome {
        self.outcomes.lock().unwrap().get(number.as_str()).cloned().unwrap_or(FetchOutcome::NotFound)
    }
}

async fn seed_orders(store: &MemoryStore, login: &str, numbers: &[&str]) {
    for number in numbers {
        store.insert_order(login, &OrderNumber::from(*number)).await.expect("Error inserting order");
    }
}

/// The full stack on the production backend: a Luhn-valid order settles as PROCESSED with 500.0 points and the
/// owner's balance grows by exactly that amount.
#[tokio::test]
async fn a_processed_settlement_credits_the_owner() {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    AuthApi::new(db.clone()).register("alice", "hunter2").await.expect("Error registering user");
    OrderApi::new(db.clone()).submit_order("alice", "12345678903").await.expect("Error submitting order");

    let authority = ScriptedAuthority::default();
    authority.processed("12345678903", 500);
    let reconciler = Reconciler::new(db.clone(), authority, CYCLE);

    let report = reconciler.run_cycle().await;
    assert_eq!(report.polled, 1);
    assert_eq!(report.settled, 1);

    let order = db
        .fetch_order(&OrderNumber::from("12345678903"))
        .await
        .expect("Error fetching order")
        .expect("Order missing");
    assert_eq!(order.status, OrderStatus::Processed);
    assert_eq!(order.accrual, Some(Money::from_points(500)));
    let balance = db.fetch_balance("alice").await.expect("Error fetching balance");
    assert_eq!(balance.available, Money::from_points(500));

    // The settled order has left the polling feed, so the next cycle has nothing to do
    let report = reconciler.run_cycle().await;
    assert_eq!(report.polled, 0);
}

#[tokio::test]
async fn an_invalid_settlement_never_touches_the_ledger() {
    let store = MemoryStore::new();
    seed_orders(&store, "alice", &["11111111111116"]).await;
    let authority = ScriptedAuthority::default();
    authority.script(
        "11111111111116",
        FetchOutcome::Settled { status: SettlementStatus::Invalid, accrual: Money::ZERO },
    );
    let reconciler = Reconciler::new(store.clone(), authority, CYCLE);

    let report = reconciler.run_cycle().await;
    assert_eq!(report.settled, 1);
    let order = store
        .fetch_order(&OrderNumber::from("11111111111116"))
        .await
        .expect("Error fetching order")
        .expect("Order missing");
    assert_eq!(order.status, OrderStatus::Invalid);
    assert!(order.accrual.is_none());
    assert_eq!(store.fetch_balance("alice").await.expect("Error fetching balance").available, Money::ZERO);
}

/// A 429 on the third of five orders: the first two settle, the rest stay untouched for the next cycle.
#[tokio::test]
async fn a_rate_limit_aborts_the_remainder_of_the_cycle() {
    let store = MemoryStore::new();
    let numbers = ["1", "2", "3", "4", "5"];
    seed_orders(&store, "alice", &numbers).await;
    let authority = ScriptedAuthority::default();
    authority.processed("1", 10);
    authority.processed("2", 20);
    authority.script("3", FetchOutcome::RateLimited { retry_after: None });
    authority.processed("4", 40);
    authority.processed("5", 50);
    let reconciler = Reconciler::new(store.clone(), authority.clone(), CYCLE);

    let report = reconciler.run_cycle().await;
    assert_eq!(report.polled, 3, "the cycle must stop at the rate-limited order");
    assert_eq!(report.settled, 2);
    for (number, status) in [("1", OrderStatus::Processed), ("2", OrderStatus::Processed)] {
        let order =
            store.fetch_order(&number.into()).await.expect("Error fetching order").expect("Order missing");
        assert_eq!(order.status, status);
    }
    for number in ["3", "4", "5"] {
        let order =
            store.fetch_order(&number.into()).await.expect("Error fetching order").expect("Order missing");
        assert_eq!(order.status, OrderStatus::New, "order {number} must be untouched by the aborted cycle");
    }
    assert_eq!(store.fetch_balance("alice").await.expect("Error fetching balance").available, Money::from_points(30));

    // The next cycle resumes from the full unsettled list
    authority.processed("3", 30);
    let report = reconciler.run_cycle().await;
    assert_eq!(report.polled, 3);
    assert_eq!(report.settled, 3);
    assert!(store.unsettled_orders().await.expect("Error fetching unsettled orders").is_empty());
}

#[tokio::test]
async fn the_rate_limit_back_off_is_carried_into_the_report() {
    let store = MemoryStore::new();
    seed_orders(&store, "alice", &["1"]).await;
    let authority = ScriptedAuthority::default();
    authority.script("1", FetchOutcome::RateLimited { retry_after: Some(Duration::from_secs(7)) });
    let reconciler = Reconciler::new(store.clone(), authority, CYCLE);
    let report = reconciler.run_cycle().await;
    assert_eq!(report.backoff, Some(Duration::from_secs(7)));
}

#[tokio::test]
async fn unknown_and_unavailable_orders_are_skipped_without_aborting() {
    let store = MemoryStore::new();
    seed_orders(&store, "alice", &["1", "2", "3"]).await;
    let authority = ScriptedAuthority::default();
    // "1" is unscripted and therefore unknown upstream
    authority.script("2", FetchOutcome::Unavailable("upstream 500".to_string()));
    authority.processed("3", 30);
    let reconciler = Reconciler::new(store.clone(), authority, CYCLE);

    let report = reconciler.run_cycle().await;
    assert_eq!(report.polled, 3, "transient trouble must not abort the batch");
    assert_eq!(report.settled, 1);
    let unsettled = store.unsettled_orders().await.expect("Error fetching unsettled orders");
    assert_eq!(unsettled, vec![OrderNumber::from("1"), OrderNumber::from("2")]);
}

#[tokio::test]
async fn an_acknowledged_order_moves_to_processing_but_stays_in_the_feed() {
    let store = MemoryStore::new();
    seed_orders(&store, "alice", &["1"]).await;
    let authority = ScriptedAuthority::default();
    authority.script("1", FetchOutcome::InProgress);
    let reconciler = Reconciler::new(store.clone(), authority.clone(), CYCLE);

    reconciler.run_cycle().await;
    let order = store.fetch_order(&"1".into()).await.expect("Error fetching order").expect("Order missing");
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(store.unsettled_orders().await.expect("Error fetching unsettled orders").len(), 1);
    assert_eq!(store.fetch_balance("alice").await.expect("Error fetching balance").available, Money::ZERO);

    // A later cycle can still settle it
    authority.processed("1", 10);
    let report = reconciler.run_cycle().await;
    assert_eq!(report.settled, 1);
}

/// Replaying a settlement against an already-settled order must not credit the owner a second time.
#[tokio::test]
async fn settlement_replay_does_not_double_credit() {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    AuthApi::new(db.clone()).register("alice", "hunter2").await.expect("Error registering user");
    OrderApi::new(db.clone()).submit_order("alice", "12345678903").await.expect("Error submitting order");

    let number = OrderNumber::from("12345678903");
    for _ in 0..3 {
        db.apply_settlement(&number, SettlementStatus::Processed, Some(Money::from_points(500)))
            .await
            .expect("Error applying settlement");
    }
    let balance = db.fetch_balance("alice").await.expect("Error fetching balance");
    assert_eq!(balance.available, Money::from_points(500), "replays must not credit again");
}

#[tokio::test]
async fn an_empty_feed_ends_the_cycle_with_no_side_effects() {
    let store = MemoryStore::new();
    let reconciler = Reconciler::new(store, ScriptedAuthority::default(), CYCLE);
    let report = reconciler.run_cycle().await;
    assert_eq!(report.polled, 0);
    assert_eq!(report.settled, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn the_spawned_worker_shuts_down_cleanly() {
    let store = MemoryStore::new();
    seed_orders(&store, "alice", &["1"]).await;
    let authority = ScriptedAuthority::default();
    authority.processed("1", 10);
    let reconciler = Reconciler::new(store.clone(), authority, Duration::from_millis(10));
    let (shutdown_tx, shutdown_rx) = loyalty_engine::shutdown_signal();
    let handle = ReconcilerHandle::new(shutdown_tx, tokio::spawn(reconciler.run(shutdown_rx)));

    // Give the worker a couple of ticks, then ask it to stop
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.shutdown().await;

    let order = store.fetch_order(&"1".into()).await.expect("Error fetching order").expect("Order missing");
    assert_eq!(order.status, OrderStatus::Processed);
}
