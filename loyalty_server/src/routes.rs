//! Request handler definitions.
//!
//! Each handler translates exactly one engine outcome vocabulary into HTTP status codes; no business rules live
//! here. All durable state sits behind the engine APIs, so handlers are free to run concurrently.
use actix_web::{get, http::header, post, web, HttpResponse, Responder};
use log::*;
use loyalty_engine::{
    db_types::{DebitOutcome, InsertOrderResult},
    AuthApi,
    BalanceApi,
    OrderApi,
    SqliteDatabase,
};

use crate::{
    auth::{AuthenticatedUser, TokenIssuer},
    config::AuthConfig,
    data_objects::{Credentials, TokenResponse, WithdrawalRequest},
    errors::ServerError,
};

/// Registers the full route set and its app data. Shared between the production server and the endpoint tests.
pub fn configure(cfg: &mut web::ServiceConfig, db: SqliteDatabase, auth: &AuthConfig) {
    cfg.app_data(web::Data::new(OrderApi::new(db.clone())))
        .app_data(web::Data::new(BalanceApi::new(db.clone())))
        .app_data(web::Data::new(AuthApi::new(db)))
        .app_data(web::Data::new(TokenIssuer::new(auth)))
        .service(health)
        .service(register)
        .service(login)
        .service(submit_order)
        .service(list_orders)
        .service(balance)
        .service(withdraw)
        .service(list_withdrawals);
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("👍️\n")
}

#[post("/api/user/register")]
pub async fn register(
    body: web::Json<Credentials>,
    auth_api: web::Data<AuthApi<SqliteDatabase>>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    auth_api.register(&body.login, &body.password).await?;
    info!("🧑️ New user registered: {}", body.login);
    token_response(&issuer, &body.login)
}

#[post("/api/user/login")]
pub async fn login(
    body: web::Json<Credentials>,
    auth_api: web::Data<AuthApi<SqliteDatabase>>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    auth_api.verify(&body.login, &body.password).await?;
    token_response(&issuer, &body.login)
}

fn token_response(issuer: &TokenIssuer, login_name: &str) -> Result<HttpResponse, ServerError> {
    let token = issuer.issue_token(login_name)?;
    Ok(HttpResponse::Ok()
        .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
        .json(TokenResponse { token }))
}

/// The order number arrives as a plain-text body. 202 for a fresh registration, 200 for the owner resubmitting,
/// 409 when the number belongs to someone else, 422 when the checksum does not hold.
#[post("/api/user/orders")]
pub async fn submit_order(
    user: AuthenticatedUser,
    body: String,
    orders: web::Data<OrderApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let number = body.trim();
    if number.is_empty() {
        return Err(ServerError::InvalidRequestBody("No order number provided".to_string()));
    }
    match orders.submit_order(&user.login, number).await? {
        InsertOrderResult::Inserted(_) => Ok(HttpResponse::Accepted().finish()),
        InsertOrderResult::AlreadyOwnedBySelf(_) => Ok(HttpResponse::Ok().finish()),
        InsertOrderResult::AlreadyOwnedByOther => {
            Ok(HttpResponse::Conflict()
                .json(serde_json::json!({"error": "order number is registered to another user"})))
        },
    }
}

#[get("/api/user/orders")]
pub async fn list_orders(
    user: AuthenticatedUser,
    orders: web::Data<OrderApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let orders = orders.orders(&user.login).await?;
    if orders.is_empty() {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Ok(HttpResponse::Ok().json(orders))
    }
}

#[get("/api/user/balance")]
pub async fn balance(
    user: AuthenticatedUser,
    balances: web::Data<BalanceApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let balance = balances.balance(&user.login).await?;
    Ok(HttpResponse::Ok().json(balance))
}

#[post("/api/user/balance/withdraw")]
pub async fn withdraw(
    user: AuthenticatedUser,
    body: web::Json<WithdrawalRequest>,
    balances: web::Data<BalanceApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    match balances.withdraw(&user.login, &body.order, body.sum).await? {
        DebitOutcome::Accepted(_) => Ok(HttpResponse::Ok().finish()),
        DebitOutcome::InsufficientFunds => {
            Ok(HttpResponse::PaymentRequired().json(serde_json::json!({"error": "insufficient funds"})))
        },
    }
}

#[get("/api/user/withdrawals")]
pub async fn list_withdrawals(
    user: AuthenticatedUser,
    balances: web::Data<BalanceApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let withdrawals = balances.withdrawals(&user.login).await?;
    if withdrawals.is_empty() {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Ok(HttpResponse::Ok().json(withdrawals))
    }
}
