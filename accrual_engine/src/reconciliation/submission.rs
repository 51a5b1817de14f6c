use std::sync::Arc;

use log::*;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::db_types::OrderId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Order {0} was not queued. The accrual pool is not accepting submissions")]
    QueueClosed(OrderId),
}

/// The receiving end of the submission queue, shared by every poller in the pool.
pub(crate) type JobQueue = Arc<Mutex<mpsc::Receiver<OrderId>>>;

pub(crate) fn submission_queue(capacity: usize, intake: CancellationToken) -> (OrderSubmitter, JobQueue) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (OrderSubmitter { sender, intake }, Arc::new(Mutex::new(receiver)))
}

/// Hands order numbers to the accrual pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct OrderSubmitter {
    sender: mpsc::Sender<OrderId>,
    intake: CancellationToken,
}

impl OrderSubmitter {
    /// Queues the order for reconciliation. Waits while the queue is full. Fails once the pool has started shutting
    /// down, including for callers that were already waiting.
    pub async fn submit(&self, order_id: OrderId) -> Result<(), SubmissionError> {
        if self.intake.is_cancelled() {
            return Err(SubmissionError::QueueClosed(order_id));
        }
        tokio::select! {
            biased;
            _ = self.intake.cancelled() => Err(SubmissionError::QueueClosed(order_id)),
            res = self.sender.send(order_id.clone()) => {
                res.map_err(|e| SubmissionError::QueueClosed(e.0))?;
                trace!("📮️ Order {order_id} queued for reconciliation");
                Ok(())
            },
        }
    }

    pub fn is_closed(&self) -> bool {
        self.intake.is_cancelled() || self.sender.is_closed()
    }

    /// Free slots left in the queue.
    pub fn capacity(&self) -> usize {
        self.sender.capacity()
    }
}
