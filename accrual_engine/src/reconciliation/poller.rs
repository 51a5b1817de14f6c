//! A poller drives one order at a time through the accrual service's state machine.
//!
//! For each order taken from the submission queue the poller queries the accrual service until the order reaches a
//! terminal status (`PROCESSED` or `INVALID`), writing every newly observed status to the ledger. Rate limiting and
//! "no record yet" replies are waited out. Anything else that goes wrong ends the poller: the failure is reported on
//! the result stream and the poller stops taking orders.
//!
//! Every wait races the pool's cancellation token, and cancellation is checked before each query, so a cancelled
//! poller never issues another request.
use std::{fmt::Display, sync::Arc, time::Duration};

use accrual_client::AccrualOutcome;
use log::*;
use tokio_util::sync::CancellationToken;

use crate::{
    db_types::{OrderId, OrderStatusType},
    events::{EventProducer, PollerFailure, PollerReport},
    reconciliation::{submission::JobQueue, AccrualProvider, PollerConfig},
    traits::{AccrualLedger, AccrualUpdate},
};

/// Identifies a poller in log lines and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerContext {
    pub worker_id: usize,
}

impl Display for PollerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[poller {}]", self.worker_id)
    }
}

/// How a poller's run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerExit {
    /// The submission queue was closed and drained.
    QueueClosed,
    Cancelled,
    Failed { order_id: OrderId, failure: PollerFailure },
}

/// How work on a single order ended, short of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderEnd {
    Settled(OrderStatusType),
    Interrupted,
}

pub struct Poller<P, L: ?Sized> {
    ctx: PollerContext,
    config: PollerConfig,
    provider: Arc<P>,
    ledger: Arc<L>,
    queue: JobQueue,
    reports: EventProducer<PollerReport>,
    cancel: CancellationToken,
}

impl<P, L> Poller<P, L>
where
    P: AccrualProvider,
    L: AccrualLedger + ?Sized,
{
    pub(crate) fn new(
        ctx: PollerContext,
        config: PollerConfig,
        provider: Arc<P>,
        ledger: Arc<L>,
        queue: JobQueue,
        reports: EventProducer<PollerReport>,
        cancel: CancellationToken,
    ) -> Self {
        Self { ctx, config, provider, ledger, queue, reports, cancel }
    }

    pub async fn run(self) -> PollerExit {
        debug!("{} 🔁️ Poller started", self.ctx);
        let exit = loop {
            let order_id = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break PollerExit::Cancelled,
                next = self.next_order() => match next {
                    Some(order_id) => order_id,
                    None => break PollerExit::QueueClosed,
                },
            };
            debug!("{} 🔁️ Picked up order {order_id}", self.ctx);
            match self.reconcile(&order_id).await {
                Ok(OrderEnd::Settled(status)) => debug!("{} 🔁️ Order {order_id} settled as {status}", self.ctx),
                Ok(OrderEnd::Interrupted) => {
                    info!("{} 🔁️ Cancelled while working on order {order_id}", self.ctx);
                    break PollerExit::Cancelled;
                },
                Err(failure) => {
                    error!("{} 🔁️ Giving up on order {order_id}: {failure}", self.ctx);
                    let worker_id = self.ctx.worker_id;
                    let report = PollerReport::Failed { worker_id, order_id: order_id.clone(), failure: failure.clone() };
                    self.reports.publish_event(report).await;
                    break PollerExit::Failed { order_id, failure };
                },
            }
        };
        debug!("{} 🔁️ Poller stopped: {exit:?}", self.ctx);
        exit
    }

    async fn next_order(&self) -> Option<OrderId> {
        self.queue.lock().await.recv().await
    }

    async fn reconcile(&self, order_id: &OrderId) -> Result<OrderEnd, PollerFailure> {
        let mut last_known: Option<OrderStatusType> = None;
        loop {
            if self.cancel.is_cancelled() {
                return Ok(OrderEnd::Interrupted);
            }
            let outcome =
                self.provider.query_order(order_id).await.map_err(|e| PollerFailure::Network(e.to_string()))?;
            trace!("{} 🔁️ Order {order_id}: {outcome}", self.ctx);
            let mut settled = None;
            match outcome {
                AccrualOutcome::Accrual(response) => {
                    let status = OrderStatusType::from(response.status);
                    if last_known != Some(status) {
                        let update = self.ledger.update_order_by_accrual(order_id, status, response.accrual).await?;
                        self.reports.publish_event(self.report_for(order_id, status, update)).await;
                        last_known = Some(status);
                    }
                    if status.is_terminal() {
                        settled = Some(status);
                    }
                },
                AccrualOutcome::NoContent => {
                    debug!("{} 🔁️ No accrual record for {order_id} yet", self.ctx);
                    if !self.pause(self.config.no_content_delay).await {
                        return Ok(OrderEnd::Interrupted);
                    }
                },
                AccrualOutcome::TooManyRequests { retry_after } => {
                    info!("{} 🔁️ Rate limited. Waiting {}s before asking again", self.ctx, retry_after.as_secs());
                    if !self.pause(retry_after).await {
                        return Ok(OrderEnd::Interrupted);
                    }
                },
                AccrualOutcome::InternalError => return Err(PollerFailure::InternalError),
                AccrualOutcome::MalformedResponse(reason) => return Err(PollerFailure::MalformedResponse(reason)),
                AccrualOutcome::UnexpectedStatus(code) => return Err(PollerFailure::UnexpectedStatus(code)),
            }
            let resumed = self.pause(self.config.pace).await;
            if let Some(status) = settled {
                return Ok(OrderEnd::Settled(status));
            }
            if !resumed {
                return Ok(OrderEnd::Interrupted);
            }
        }
    }

    fn report_for(&self, order_id: &OrderId, status: OrderStatusType, update: AccrualUpdate) -> PollerReport {
        let worker_id = self.ctx.worker_id;
        let order_id = order_id.clone();
        match update {
            AccrualUpdate::Unchanged(_) => PollerReport::StatusConfirmed { worker_id, order_id, status },
            AccrualUpdate::Applied { previous, order, credited } => PollerReport::StatusChanged {
                worker_id,
                order_id,
                from: previous,
                to: status,
                accrual: order.accrual,
                credited,
            },
        }
    }

    /// Sleeps for `duration` unless cancelled first. Returns `false` on cancellation.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
