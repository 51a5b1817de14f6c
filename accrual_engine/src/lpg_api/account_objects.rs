use serde::Serialize;

use crate::db_types::{Order, Points, UserAccount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub current: Points,
    pub withdrawn: Points,
}

impl From<&UserAccount> for Balance {
    fn from(account: &UserAccount) -> Self {
        Self { current: account.balance, withdrawn: account.withdrawn }
    }
}

/// The result of handing an order number to [`super::order_flow_api::OrderFlowApi::submit_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderSubmission {
    /// A new order, now queued for reconciliation.
    Accepted(Order),
    /// The user had already submitted this order number. It was not queued again.
    AlreadySubmitted(Order),
}

impl OrderSubmission {
    pub fn order(&self) -> &Order {
        match self {
            OrderSubmission::Accepted(order) => order,
            OrderSubmission::AlreadySubmitted(order) => order,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, OrderSubmission::Accepted(_))
    }
}
