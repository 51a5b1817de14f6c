//! Loyalty Accrual Engine
//!
//! Users of the loyalty gateway submit order numbers. Before any points land in a user's balance, each order has to
//! be reconciled against an external accrual service that decides whether, and how much, the order earns. This
//! library contains that reconciliation machinery together with the storage it writes to.
//!
//! The library is divided into these main sections:
//! 1. Storage contracts ([`mod@traits`]) and their backends: [`SqliteDatabase`] and the in-memory [`MemoryDatabase`].
//!    The data types stored by the backends live in [`mod@db_types`].
//! 2. The reconciliation engine ([`mod@reconciliation`]). A fixed pool of pollers takes order numbers from a bounded
//!    queue and drives each one to a terminal status, recording every status change through the
//!    [`traits::AccrualLedger`] contract.
//! 3. The public API (`lpg_api`), which validates and records order submissions, and manages balances and
//!    withdrawals.
//!
//! The engine reports what it does on a result stream. Hooks can be attached to it through [`events::EventHooks`].
pub mod db_types;
pub mod events;
pub mod helpers;
mod lpg_api;
pub mod memory;
pub mod reconciliation;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use lpg_api::{
    account_objects::{self, Balance, OrderSubmission},
    accounts_api::AccountApi,
    errors::{AccountApiError, OrderFlowError},
    order_flow_api::OrderFlowApi,
};
pub use memory::MemoryDatabase;
pub use reconciliation::{AccrualPool, OrderSubmitter, PoolConfig, SubmissionError};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    AccountManagement,
    AccrualLedger,
    AccrualUpdate,
    Closeable,
    LedgerError,
    LoyaltyDatabase,
    OrderManagement,
    StorageError,
};
