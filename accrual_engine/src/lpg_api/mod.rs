//! # Loyalty gateway public API
//!
//! The `lpg_api` module exposes the programmatic API that the user-facing layer calls into.
//!
//! * [`order_flow_api`] accepts order numbers from users, records them and hands them to the accrual pool.
//! * [`accounts_api`] provides balances, withdrawals and order histories.
//!
//! # API usage
//!
//! An API instance is created by supplying a storage backend that implements the backend traits the API needs.
//!
//! ```rust,ignore
//! use accrual_engine::{AccountApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/loyalty_store.db", 5).await?;
//! let api = AccountApi::new(db);
//! let balance = api.balance(user_id).await?;
//! ```
pub mod account_objects;
pub mod accounts_api;
pub mod errors;
pub mod order_flow_api;
