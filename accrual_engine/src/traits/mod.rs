//! # Storage contracts
//!
//! This module defines the behaviour a storage backend needs to expose in order to be used by the accrual engine and
//! the loyalty gateway.
//!
//! * [`AccrualLedger`] is the narrow contract the pollers use to record accrual results. It is the only way an order's
//!   status changes, and the only way points are credited.
//! * [`OrderManagement`] stores and looks up submitted orders.
//! * [`AccountManagement`] manages user accounts, balances and withdrawals.
//! * [`Closeable`] releases a backend's resources.
//! * [`LoyaltyDatabase`] ties all of the above together.
mod account_management;
mod accrual_ledger;
mod loyalty_database;
mod order_management;

pub use account_management::{AccountManagement, StorageError};
pub use accrual_ledger::{accrual_credit, check_credit, check_transition, AccrualLedger, AccrualUpdate, LedgerError};
pub use loyalty_database::{Closeable, LoyaltyDatabase};
pub use order_management::OrderManagement;
