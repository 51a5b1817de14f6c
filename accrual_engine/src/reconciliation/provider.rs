use accrual_client::{AccrualApi, AccrualApiError, AccrualOutcome};
use async_trait::async_trait;

use crate::db_types::OrderId;

/// Anything that can answer "what is the accrual status of this order?".
///
/// [`AccrualApi`] is the production implementation.
#[async_trait]
pub trait AccrualProvider: Send + Sync + 'static {
    async fn query_order(&self, order_id: &OrderId) -> Result<AccrualOutcome, AccrualApiError>;
}

#[async_trait]
impl AccrualProvider for AccrualApi {
    async fn query_order(&self, order_id: &OrderId) -> Result<AccrualOutcome, AccrualApiError> {
        AccrualApi::query_order(self, order_id.as_str()).await
    }
}
