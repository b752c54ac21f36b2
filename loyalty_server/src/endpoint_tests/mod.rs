use actix_web::{
    http::{header, StatusCode},
    test,
    App,
};
use loyalty_engine::{
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    SqliteDatabase,
};

use crate::{config::AuthConfig, data_objects::TokenResponse, routes};

async fn test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

macro_rules! test_service {
    ($db:expr, $auth:expr) => {
        test::init_service(App::new().configure(|cfg| routes::configure(cfg, $db.clone(), &$auth))).await
    };
}

async fn register(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
    login: &str,
) -> String {
    let req = test::TestRequest::post()
        .uri("/api/user/register")
        .set_json(serde_json::json!({"login": login, "password": "hunter2"}))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: TokenResponse = test::read_body_json(resp).await;
    body.token
}

#[actix_web::test]
async fn registration_and_login_issue_tokens() {
    let db = test_db().await;
    let auth = AuthConfig::default();
    let app = test_service!(db, auth);

    let token = register(&app, "alice").await;
    assert!(!token.is_empty());

    // The login is now taken
    let req = test::TestRequest::post()
        .uri("/api/user/register")
        .set_json(serde_json::json!({"login": "alice", "password": "other"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Wrong password
    let req = test::TestRequest::post()
        .uri("/api/user/login")
        .set_json(serde_json::json!({"login": "alice", "password": "wrong"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Correct credentials
    let req = test::TestRequest::post()
        .uri("/api/user/login")
        .set_json(serde_json::json!({"login": "alice", "password": "hunter2"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn order_submission_translates_outcomes_to_status_codes() {
    let db = test_db().await;
    let auth = AuthConfig::default();
    let app = test_service!(db, auth);
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let submit = |token: String, number: &'static str| {
        test::TestRequest::post()
            .uri("/api/user/orders")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .insert_header((header::CONTENT_TYPE, "text/plain"))
            .set_payload(number)
            .to_request()
    };

    let resp = test::call_service(&app, submit(alice.clone(), "12345678903")).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let resp = test::call_service(&app, submit(alice.clone(), "12345678903")).await;
    assert_eq!(resp.status(), StatusCode::OK, "resubmission by the owner is a 200");
    let resp = test::call_service(&app, submit(bob.clone(), "12345678903")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let resp = test::call_service(&app, submit(alice.clone(), "12345678901")).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // No token at all
    let req = test::TestRequest::post()
        .uri("/api/user/orders")
        .insert_header((header::CONTENT_TYPE, "text/plain"))
        .set_payload("12345678903")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn listings_use_204_for_empty_and_200_for_content() {
    let db = test_db().await;
    let auth = AuthConfig::default();
    let app = test_service!(db, auth);
    let token = register(&app, "alice").await;
    let authed = |req: test::TestRequest| {
        req.insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
    };

    let resp = test::call_service(&app, authed(test::TestRequest::get().uri("/api/user/orders")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp =
        test::call_service(&app, authed(test::TestRequest::get().uri("/api/user/withdrawals")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = authed(test::TestRequest::post().uri("/api/user/orders"))
        .insert_header((header::CONTENT_TYPE, "text/plain"))
        .set_payload("12345678903")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = test::call_service(&app, authed(test::TestRequest::get().uri("/api/user/orders")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let orders: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(orders[0]["number"], "12345678903");
    assert_eq!(orders[0]["status"], "NEW");
    assert!(orders[0].get("accrual").is_none(), "unsettled orders carry no accrual field");

    let resp = test::call_service(&app, authed(test::TestRequest::get().uri("/api/user/balance")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let balance: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(balance["available"], 0.0);
    assert_eq!(balance["withdrawn"], 0.0);
}

#[actix_web::test]
async fn withdrawal_requests_map_to_402_and_422() {
    let db = test_db().await;
    let auth = AuthConfig::default();
    let app = test_service!(db, auth);
    let token = register(&app, "alice").await;
    let withdraw = |body: serde_json::Value| {
        test::TestRequest::post()
            .uri("/api/user/balance/withdraw")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .set_json(body)
            .to_request()
    };

    let resp = test::call_service(&app, withdraw(serde_json::json!({"order": "12345678903", "sum": 600}))).await;
    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
    let resp = test::call_service(&app, withdraw(serde_json::json!({"order": "12345678901", "sum": 10}))).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let resp = test::call_service(&app, withdraw(serde_json::json!({"order": "12345678903", "sum": -5}))).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
