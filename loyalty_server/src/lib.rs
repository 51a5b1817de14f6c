//! # Loyalty accrual server
//!
//! Runs the accrual reconciliation engine as a long-lived process. It is responsible for:
//! * Reading its configuration from the environment. See [config](config/index.html) for more information.
//! * Opening the loyalty database, either SQLite or the in-memory store.
//! * Starting the pool of accrual pollers and queueing any orders that were left unfinished by the previous run.
//! * Stopping the pool cleanly on SIGINT or SIGTERM, and closing the database afterwards.

pub mod accrual_worker;
pub mod cli;
pub mod config;
pub mod errors;
pub mod server;

#[cfg(test)]
mod test;
