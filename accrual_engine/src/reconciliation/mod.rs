//! # Accrual reconciliation
//!
//! Submitted orders are reconciled against the external accrual service in the background by a fixed pool of
//! [`Poller`]s.
//!
//! ```text
//!  OrderSubmitter ──► submission queue ──► Poller × pool_size ──► result stream ──► ResultSink ──► hooks
//!                                             │
//!                                             └──► AccrualLedger (status + balance, atomically)
//! ```
//!
//! [`AccrualPool`] owns the tasks and the shared cancellation token. See [`AccrualPool::shutdown`] for the stop
//! sequence.
mod config;
mod poller;
mod pool;
mod provider;
mod submission;


pub use config::{
    PollerConfig,
    PoolConfig,
    DEFAULT_NO_CONTENT_DELAY,
    DEFAULT_PACE,
    DEFAULT_POOL_SIZE,
    DEFAULT_SHUTDOWN_GRACE_PERIOD,
    DEFAULT_SUBMISSION_QUEUE_SIZE,
};
pub use poller::{Poller, PollerContext, PollerExit};
pub use pool::{AccrualPool, ShutdownSummary};
pub use provider::AccrualProvider;
pub use submission::{OrderSubmitter, SubmissionError};
