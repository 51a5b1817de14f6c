use std::{future::Future, pin::Pin};

use accrual_client::AccrualApi;
use accrual_engine::{
    events::{EventHooks, PointsCreditedEvent},
    reconciliation::ShutdownSummary,
    AccountApi,
    AccrualPool,
    LoyaltyDatabase,
    OrderFlowApi,
};
use log::*;
use tokio::task::JoinHandle;

use crate::{config::ServerConfig, errors::ServerError};

/// The running accrual pool, together with the APIs that feed it and read what it wrote.
pub struct AccrualWorker<B> {
    pool: AccrualPool,
    orders: OrderFlowApi<B>,
    accounts: AccountApi<B>,
    resubmission: Option<JoinHandle<()>>,
}

/// Starts the accrual pool against `db`.
///
/// If `config.resubmit_on_start` is set, unfinished orders are queued in the background so that startup does not wait
/// on a full submission queue.
pub fn start_accrual_worker<B>(db: B, config: &ServerConfig) -> Result<AccrualWorker<B>, ServerError>
where B: LoyaltyDatabase {
    let api = AccrualApi::new(config.accrual.clone())?;
    let mut hooks = EventHooks::default();
    hooks.on_points_credited(log_points_credited);
    let (pool, submitter) = AccrualPool::start(config.pool.clone(), api, db.clone(), hooks);
    info!("🕰️ Accrual worker started. Polling {}", config.accrual.base_url);

    let resubmission = config.resubmit_on_start.then(|| {
        let api = OrderFlowApi::new(db.clone(), submitter.clone());
        tokio::spawn(async move {
            info!("🕰️ Queueing unfinished orders");
            match api.resubmit_unfinished().await {
                Ok(0) => info!("🕰️ No unfinished orders to resume"),
                Ok(n) => info!("🕰️ {n} unfinished orders queued"),
                Err(e) => warn!("🕰️ Not every unfinished order was queued. {e}"),
            }
        })
    });

    let orders = OrderFlowApi::new(db.clone(), submitter);
    let accounts = AccountApi::new(db);
    Ok(AccrualWorker { pool, orders, accounts, resubmission })
}

fn log_points_credited(ev: PointsCreditedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        info!("💰️ {} credited for order {} ({})", ev.credited, ev.order_id, ev.status);
    })
}

impl<B> AccrualWorker<B> {
    pub fn orders(&self) -> &OrderFlowApi<B> {
        &self.orders
    }

    pub fn accounts(&self) -> &AccountApi<B> {
        &self.accounts
    }

    pub fn active_pollers(&self) -> usize {
        self.pool.active_pollers()
    }

    /// Stops the pool, and with it any resubmission still in progress.
    pub async fn shutdown(self) -> ShutdownSummary {
        let summary = self.pool.shutdown().await;
        if let Some(handle) = self.resubmission {
            if let Err(e) = handle.await {
                error!("🕰️ The resubmission task did not finish cleanly. {e}");
            }
        }
        info!(
            "🕰️ Accrual worker stopped. {} pollers stopped, {} failed, {} aborted. {} orders left for the next run",
            summary.stopped, summary.failed, summary.aborted, summary.abandoned_orders
        );
        summary
    }
}
