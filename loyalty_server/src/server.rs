use std::future::Future;

use accrual_engine::{reconciliation::ShutdownSummary, LoyaltyDatabase, MemoryDatabase};
#[cfg(feature = "sqlite")]
use accrual_engine::SqliteDatabase;
use log::*;

use crate::{accrual_worker::start_accrual_worker, config::ServerConfig, errors::ServerError};

/// Opens the configured database and runs the accrual worker until SIGINT or SIGTERM arrives.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    if config.uses_memory_backend() {
        warn!("🗃️ Using the in-memory store. Balances and orders will be lost when the server stops.");
        run_with_backend(MemoryDatabase::new(), &config, shutdown_signal()).await?;
        return Ok(());
    }
    let db = open_sqlite(&config).await?;
    run_with_backend(db, &config, shutdown_signal()).await?;
    Ok(())
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(config: &ServerConfig) -> Result<SqliteDatabase, ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_db_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not migrate the database. {e}")))?;
    Ok(db)
}

#[cfg(not(feature = "sqlite"))]
async fn open_sqlite(config: &ServerConfig) -> Result<MemoryDatabase, ServerError> {
    Err(ServerError::ConfigurationError(format!(
        "{} is not supported. This server was built without SQLite support. Set LPG_DATABASE_URL to `memory`.",
        config.database_url
    )))
}

/// Runs the accrual worker against `db` until `shutdown` completes, then stops the worker and closes the database.
pub async fn run_with_backend<B, S>(db: B, config: &ServerConfig, shutdown: S) -> Result<ShutdownSummary, ServerError>
where
    B: LoyaltyDatabase,
    S: Future<Output = ()>,
{
    let mut db = db;
    let worker = start_accrual_worker(db.clone(), config)?;
    info!("🚀️ Loyalty accrual server running against {}", db.url());
    shutdown.await;
    info!("🛑️ Shutting down");
    let summary = worker.shutdown().await;
    db.close().await?;
    info!("🗃️ Database closed");
    Ok(summary)
}

/// Completes on Ctrl-C, or on SIGTERM on unix platforms.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("🛑️ Could not listen for Ctrl-C. {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                error!("🛑️ Could not listen for SIGTERM. {e}");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("🛑️ Ctrl-C received"),
        _ = terminate => info!("🛑️ SIGTERM received"),
    }
}
