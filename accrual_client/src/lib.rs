//! # Accrual client
//!
//! A thin client for the external accrual calculation service. Each call to [`AccrualApi::query_order`] issues a
//! single logical `GET /api/orders/{number}` request and classifies the reply into an [`AccrualOutcome`].
//!
//! Transport failures (connection refused, timeouts) are retried internally on a fixed delay schedule before
//! [`AccrualApiError::Network`] is returned. Everything the server actually answers, including rate limiting and
//! server errors, is reported as an outcome so that callers can decide what to do with it.
mod api;
mod config;
mod error;
mod helpers;

mod data_objects;

pub use api::AccrualApi;
pub use config::{AccrualConfig, DEFAULT_RETRY_AFTER, DEFAULT_RETRY_DELAYS};
pub use data_objects::{AccrualOutcome, AccrualResponse, AccrualStatus, AccrualStatusError};
pub use error::AccrualApiError;
pub use helpers::{is_json_content_type, normalize_base_url, parse_retry_after};
