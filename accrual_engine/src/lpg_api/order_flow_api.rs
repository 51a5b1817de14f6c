use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{InsertOrderResult, NewOrder, Order, OrderId},
    lpg_api::{account_objects::OrderSubmission, errors::OrderFlowError},
    reconciliation::OrderSubmitter,
    traits::OrderManagement,
};

/// `OrderFlowApi` is the entry point for order numbers submitted by users.
///
/// Orders are validated, recorded as `NEW` and then handed to the accrual pool through an [`OrderSubmitter`]. The
/// order is always stored before it is queued, so an order that could not be queued (because the pool is shutting
/// down, say) is picked up again by [`OrderFlowApi::resubmit_unfinished`].
pub struct OrderFlowApi<B> {
    db: B,
    submitter: OrderSubmitter,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, submitter: OrderSubmitter) -> Self {
        Self { db, submitter }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Accepts an order number from user `user_id`.
    ///
    /// The number is trimmed and must pass the Luhn check. Submitting the same number twice is harmless and reports
    /// [`OrderSubmission::AlreadySubmitted`]; submitting a number that another user has already claimed fails with
    /// [`OrderFlowError::OrderOwnedByAnotherUser`].
    ///
    /// Waits if the accrual pool's submission queue is full.
    pub async fn submit_order(&self, user_id: i64, raw_order_number: &str) -> Result<OrderSubmission, OrderFlowError> {
        let order_id = OrderId::parse_luhn(raw_order_number)?;
        match self.db.insert_order(NewOrder::new(order_id, user_id)).await? {
            InsertOrderResult::Inserted(order) => {
                self.submitter.submit(order.order_id.clone()).await?;
                debug!("🔄️📦️ Order {} from user #{user_id} accepted and queued", order.order_id);
                Ok(OrderSubmission::Accepted(order))
            },
            InsertOrderResult::AlreadyExists(order) => {
                debug!("🔄️📦️ Order {} was already submitted by user #{user_id}", order.order_id);
                Ok(OrderSubmission::AlreadySubmitted(order))
            },
        }
    }

    /// Queues every order that has not reached a terminal status, oldest first. Returns the number of orders queued.
    ///
    /// Call this once at startup, before accepting new submissions, to pick up work that was interrupted by a restart.
    pub async fn resubmit_unfinished(&self) -> Result<usize, OrderFlowError> {
        let orders = self.db.fetch_unfinished_orders().await?;
        let count = orders.len();
        for order in orders {
            trace!("🔄️📦️ Resubmitting order {} ({})", order.order_id, order.status);
            self.submitter.submit(order.order_id).await?;
        }
        if count > 0 {
            info!("🔄️📦️ {count} unfinished orders resubmitted for reconciliation");
        }
        Ok(count)
    }

    /// Orders submitted by the user, most recent first.
    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        let orders = self.db.fetch_orders_for_user(user_id).await?;
        Ok(orders)
    }
}
