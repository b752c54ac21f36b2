use loyalty_engine::{
    db_types::{InsertOrderResult, OrderNumber, OrderStatus, SettlementApplied, SettlementStatus},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{LoyaltyDatabase, OrderManagement, StoreError},
    AuthApi,
    OrderApi,
    OrderApiError,
    SqliteDatabase,
};
use lpg_common::Money;

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

async fn register(db: &SqliteDatabase, login: &str) {
    AuthApi::new(db.clone()).register(login, "hunter2").await.expect("Error registering user");
}

#[tokio::test]
async fn submitting_a_new_order_registers_it_for_the_user() {
    let db = new_db().await;
    register(&db, "alice").await;
    let api = OrderApi::new(db.clone());
    let result = api.submit_order("alice", "12345678903").await.expect("Error submitting order");
    assert!(matches!(result, InsertOrderResult::Inserted(_)));
    let orders = api.orders("alice").await.expect("Error listing orders");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].number, OrderNumber::from("12345678903"));
    assert_eq!(orders[0].status, OrderStatus::New);
    assert!(orders[0].accrual.is_none());
}

#[tokio::test]
async fn resubmission_by_the_owner_is_idempotent() {
    let db = new_db().await;
    register(&db, "alice").await;
    let api = OrderApi::new(db.clone());
    api.submit_order("alice", "12345678903").await.expect("Error submitting order");
    let second = api.submit_order("alice", "12345678903").await.expect("Error resubmitting order");
    assert!(matches!(second, InsertOrderResult::AlreadyOwnedBySelf(_)));
    let orders = api.orders("alice").await.expect("Error listing orders");
    assert_eq!(orders.len(), 1, "resubmission must not create a second order");
}

#[tokio::test]
async fn a_number_owned_by_someone_else_is_a_permanent_conflict() {
    let db = new_db().await;
    register(&db, "alice").await;
    register(&db, "bob").await;
    let api = OrderApi::new(db.clone());
    api.submit_order("alice", "12345678903").await.expect("Error submitting order");
    for _ in 0..3 {
        let result = api.submit_order("bob", "12345678903").await.expect("Error submitting order");
        assert!(matches!(result, InsertOrderResult::AlreadyOwnedByOther));
    }
    assert!(api.orders("bob").await.expect("Error listing orders").is_empty());
}

#[tokio::test]
async fn malformed_numbers_are_rejected_before_they_reach_the_store() {
    let db = new_db().await;
    register(&db, "alice").await;
    let api = OrderApi::new(db.clone());
    for bad in ["12345678901", "not-a-number", ""] {
        let result = api.submit_order("alice", bad).await;
        assert!(matches!(result, Err(OrderApiError::InvalidOrderNumber)), "{bad:?} should be rejected");
    }
    assert!(api.orders("alice").await.expect("Error listing orders").is_empty());
}

#[tokio::test]
async fn orders_are_listed_oldest_first() {
    let db = new_db().await;
    register(&db, "alice").await;
    let api = OrderApi::new(db.clone());
    for number in ["12345678903", "79927398713", "4561261212345467"] {
        api.submit_order("alice", number).await.expect("Error submitting order");
    }
    let orders = api.orders("alice").await.expect("Error listing orders");
    let numbers: Vec<&str> = orders.iter().map(|o| o.number.as_str()).collect();
    assert_eq!(numbers, vec!["12345678903", "79927398713", "4561261212345467"]);
    assert!(orders.windows(2).all(|w| w[0].submitted_at <= w[1].submitted_at));
}

#[tokio::test]
async fn the_unsettled_feed_tracks_terminal_transitions() {
    let db = new_db().await;
    register(&db, "alice").await;
    let api = OrderApi::new(db.clone());
    for number in ["12345678903", "79927398713", "4561261212345467"] {
        api.submit_order("alice", number).await.expect("Error submitting order");
    }
    db.apply_settlement(&OrderNumber::from("12345678903"), SettlementStatus::Processed, Some(Money::from_points(10)))
        .await
        .expect("Error applying settlement");
    db.apply_settlement(&OrderNumber::from("79927398713"), SettlementStatus::Invalid, None)
        .await
        .expect("Error applying settlement");
    let unsettled = db.unsettled_orders().await.expect("Error fetching unsettled orders");
    assert_eq!(unsettled, vec![OrderNumber::from("4561261212345467")]);
}

#[tokio::test]
async fn terminal_orders_are_immutable() {
    let db = new_db().await;
    register(&db, "alice").await;
    let api = OrderApi::new(db.clone());
    api.submit_order("alice", "12345678903").await.expect("Error submitting order");
    let number = OrderNumber::from("12345678903");
    db.apply_settlement(&number, SettlementStatus::Processed, Some(Money::from_points(500)))
        .await
        .expect("Error applying settlement");

    // Neither a second settlement nor a direct advance may touch the order again
    let replay = db.apply_settlement(&number, SettlementStatus::Invalid, None).await.expect("Error on replay");
    assert!(matches!(replay, SettlementApplied::AlreadySettled(OrderStatus::Processed)));
    let advance = db
        .advance_order(&number, OrderStatus::Processing, None)
        .await
        .expect("Error on advance");
    assert!(matches!(advance, SettlementApplied::AlreadySettled(OrderStatus::Processed)));

    let order = db.fetch_order(&number).await.expect("Error fetching order").expect("Order missing");
    assert_eq!(order.status, OrderStatus::Processed);
    assert_eq!(order.accrual, Some(Money::from_points(500)));
}

#[tokio::test]
async fn advancing_an_unknown_order_fails_with_not_found() {
    let db = new_db().await;
    let number = OrderNumber::from("12345678903");
    let result = db.advance_order(&number, OrderStatus::Processing, None).await;
    assert!(matches!(result, Err(StoreError::OrderNotFound(_))));
}
