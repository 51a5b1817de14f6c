use std::fmt::Display;

use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType, Points},
    traits::LedgerError,
};

/// Why a poller gave up. Every one of these terminates the poller that hit it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollerFailure {
    #[error("accrual service internal error")]
    InternalError,
    #[error("malformed accrual response: {0}")]
    MalformedResponse(String),
    #[error("unexpected HTTP status {0} from accrual service")]
    UnexpectedStatus(u16),
    #[error("{0}")]
    Network(String),
    #[error("ledger update failed: {0}")]
    Ledger(#[from] LedgerError),
}

/// A message on the result stream. Purely informational; nothing in the engine depends on these being consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerReport {
    /// Storage accepted a new status for the order.
    StatusChanged {
        worker_id: usize,
        order_id: OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
        accrual: Points,
        credited: Points,
    },
    /// The accrual service reported a status that storage already had.
    StatusConfirmed { worker_id: usize, order_id: OrderId, status: OrderStatusType },
    /// The poller aborted while working on the order.
    Failed { worker_id: usize, order_id: OrderId, failure: PollerFailure },
}

impl PollerReport {
    pub fn worker_id(&self) -> usize {
        match self {
            PollerReport::StatusChanged { worker_id, .. } => *worker_id,
            PollerReport::StatusConfirmed { worker_id, .. } => *worker_id,
            PollerReport::Failed { worker_id, .. } => *worker_id,
        }
    }

    pub fn order_id(&self) -> &OrderId {
        match self {
            PollerReport::StatusChanged { order_id, .. } => order_id,
            PollerReport::StatusConfirmed { order_id, .. } => order_id,
            PollerReport::Failed { order_id, .. } => order_id,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PollerReport::Failed { .. })
    }
}

impl Display for PollerReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollerReport::StatusChanged { worker_id, order_id, from, to, accrual, credited } => write!(
                f,
                "[poller {worker_id}] order {order_id}: {from} -> {to}, accrual {accrual}, {credited} credited"
            ),
            PollerReport::StatusConfirmed { worker_id, order_id, status } => {
                write!(f, "[poller {worker_id}] order {order_id} is already {status}")
            },
            PollerReport::Failed { worker_id, order_id, failure } => {
                write!(f, "[poller {worker_id}] order {order_id} aborted: {failure}")
            },
        }
    }
}

/// Emitted whenever an accrual update adds points to a user's balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsCreditedEvent {
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub credited: Points,
}

impl PointsCreditedEvent {
    pub fn new(order_id: OrderId, status: OrderStatusType, credited: Points) -> Self {
        Self { order_id, status, credited }
    }
}
