use async_trait::async_trait;

use crate::{
    db_types::{InsertOrderResult, NewOrder, Order, OrderId},
    traits::StorageError,
};

#[async_trait]
pub trait OrderManagement {
    /// Stores a new order with status `NEW`.
    ///
    /// This call is idempotent for the submitting user: if they already submitted the order number, the stored order is
    /// returned as [`InsertOrderResult::AlreadyExists`]. If a *different* user owns the order number,
    /// [`StorageError::DuplicateOrder`] is returned.
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, StorageError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StorageError>;

    /// Orders belonging to the user, most recent first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, StorageError>;

    /// Every order that has not yet reached a terminal status, oldest first.
    async fn fetch_unfinished_orders(&self) -> Result<Vec<Order>, StorageError>;
}
