use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    events::{result_stream, EventHandlers, EventHooks},
    reconciliation::{
        poller::{Poller, PollerContext, PollerExit},
        submission::{submission_queue, JobQueue},
        AccrualProvider,
        OrderSubmitter,
        PoolConfig,
    },
    traits::AccrualLedger,
};

/// Decrements the live-poller count when a poller task ends, however it ends.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// What [`AccrualPool::shutdown`] found on the way out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownSummary {
    /// Pollers that exited on their own, by observing cancellation or the closed queue.
    pub stopped: usize,
    /// Pollers that had already died of a fatal error.
    pub failed: usize,
    /// Tasks (pollers, the result sink or event handlers) that outlived the grace period and were aborted.
    pub aborted: usize,
    /// Order numbers left in the submission queue. They are still `NEW` in storage.
    pub abandoned_orders: usize,
    /// Reports handled by the result sink over the pool's lifetime, if it exited in time.
    pub reports_handled: Option<usize>,
}

/// A fixed set of pollers sharing one submission queue, plus the result sink that drains their reports.
pub struct AccrualPool {
    cancel: CancellationToken,
    intake: CancellationToken,
    queue: JobQueue,
    pollers: Vec<JoinHandle<PollerExit>>,
    sink: JoinHandle<usize>,
    handlers: Vec<JoinHandle<()>>,
    active: Arc<AtomicUsize>,
    grace_period: Duration,
}

impl AccrualPool {
    /// Spawns `config.pool_size` pollers and the result sink onto the current tokio runtime.
    ///
    /// Returns the pool handle, used to stop it, and the submitter used to feed it order numbers.
    pub fn start<P, L>(config: PoolConfig, provider: P, ledger: L, hooks: EventHooks) -> (Self, OrderSubmitter)
    where
        P: AccrualProvider,
        L: AccrualLedger + 'static,
    {
        Self::start_shared(config, Arc::new(provider), Arc::new(ledger), hooks)
    }

    /// As [`AccrualPool::start`], for a provider and ledger that are already shared.
    pub fn start_shared<P, L>(
        config: PoolConfig,
        provider: Arc<P>,
        ledger: Arc<L>,
        hooks: EventHooks,
    ) -> (Self, OrderSubmitter)
    where
        P: AccrualProvider,
        L: AccrualLedger + ?Sized + 'static,
    {
        let pool_size = config.pool_size.max(1);
        let cancel = CancellationToken::new();
        let intake = CancellationToken::new();
        let (submitter, queue) = submission_queue(config.submission_queue_size, intake.clone());

        let handlers = EventHandlers::new(pool_size, &hooks);
        let producers = handlers.producers();
        let handlers = handlers.start_handlers();
        let (reports, sink) = result_stream(pool_size, cancel.clone(), hooks.on_report.clone(), producers);
        let sink = tokio::spawn(sink.run());

        let active = Arc::new(AtomicUsize::new(0));
        let pollers = (0..pool_size)
            .map(|worker_id| {
                let poller = Poller::new(
                    PollerContext { worker_id },
                    config.poller,
                    Arc::clone(&provider),
                    Arc::clone(&ledger),
                    Arc::clone(&queue),
                    reports.clone(),
                    cancel.clone(),
                );
                active.fetch_add(1, Ordering::SeqCst);
                let guard = ActiveGuard(Arc::clone(&active));
                tokio::spawn(async move {
                    let _guard = guard;
                    poller.run().await
                })
            })
            .collect::<Vec<_>>();
        info!("🟢️ Accrual pool running with {pool_size} pollers");
        let pool =
            Self { cancel, intake, queue, pollers, sink, handlers, active, grace_period: config.shutdown_grace_period };
        (pool, submitter)
    }

    /// The number of pollers still alive. Pollers that die of a fatal error are not replaced.
    pub fn active_pollers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stops the pool.
    ///
    /// New submissions are refused, cancellation is signalled, and every task is given until the grace period
    /// expires to exit. Tasks still running after that are aborted. Either way, every task has finished by the time
    /// this returns.
    pub async fn shutdown(self) -> ShutdownSummary {
        info!("🟠️ Accrual pool stopping. {} pollers active", self.active_pollers());
        self.intake.cancel();
        self.cancel.cancel();
        let deadline = Instant::now() + self.grace_period;
        let mut summary = ShutdownSummary::default();

        for (worker_id, mut handle) in self.pollers.into_iter().enumerate() {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(PollerExit::Failed { .. })) => summary.failed += 1,
                Ok(Ok(_)) => summary.stopped += 1,
                Ok(Err(e)) => {
                    error!("🟠️ Poller {worker_id} panicked: {e}");
                    summary.failed += 1;
                },
                Err(_) => {
                    warn!("🟠️ Poller {worker_id} did not stop within the grace period. Aborting it");
                    handle.abort();
                    let _ = handle.await;
                    summary.aborted += 1;
                },
            }
        }

        let mut sink = self.sink;
        match tokio::time::timeout_at(deadline, &mut sink).await {
            Ok(Ok(handled)) => summary.reports_handled = Some(handled),
            Ok(Err(e)) => error!("🟠️ Result sink panicked: {e}"),
            Err(_) => {
                warn!("🟠️ Result sink did not stop within the grace period. Aborting it");
                sink.abort();
                let _ = sink.await;
                summary.aborted += 1;
            },
        }

        // The sink held the last event producers, so the handlers now finish their outstanding jobs and exit.
        for mut handle in self.handlers {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {},
                Ok(Err(e)) => error!("🟠️ Event handler panicked: {e}"),
                Err(_) => {
                    warn!("🟠️ Event handler did not finish within the grace period. Aborting it");
                    handle.abort();
                    let _ = handle.await;
                    summary.aborted += 1;
                },
            }
        }

        let mut queue = self.queue.lock().await;
        queue.close();
        while queue.try_recv().is_ok() {
            summary.abandoned_orders += 1;
        }
        if summary.abandoned_orders > 0 {
            info!("🟠️ {} queued orders were not reconciled and remain NEW", summary.abandoned_orders);
        }
        info!("🔴️ Accrual pool stopped. {summary:?}");
        summary
    }
}
