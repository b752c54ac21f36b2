use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, App, HttpServer};
use log::*;
use loyalty_engine::{accrual::AccrualClient, shutdown_signal, Reconciler, ReconcilerHandle, SqliteDatabase};

use crate::{config::ServerConfig, errors::ServerError, routes};

/// Opens the database, starts the reconciliation worker and runs the HTTP server until it exits. Storage
/// initialization failure here is the one error that is allowed to take the process down.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let accrual = AccrualClient::new(config.accrual.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let reconciler = Reconciler::new(db.clone(), accrual, config.poll_interval);
    let (shutdown_tx, shutdown_rx) = shutdown_signal();
    let worker = ReconcilerHandle::new(shutdown_tx, tokio::spawn(reconciler.run(shutdown_rx)));

    let srv = create_server_instance(config, db)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));

    // Let an in-flight reconciliation cycle finish before the process goes away
    info!("🚀️ Server stopped. Shutting down the reconciliation worker");
    worker.shutdown().await;
    result
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let run_address = config.run_address.clone();
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("lpg::access_log"))
            .configure(|cfg| routes::configure(cfg, db.clone(), &config.auth))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind(run_address.as_str())?
    .run();
    Ok(srv)
}
