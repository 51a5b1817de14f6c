use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderIdError, Points},
    reconciliation::SubmissionError,
    traits::StorageError,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderFlowError {
    #[error("Invalid order number. {0}")]
    InvalidOrderNumber(#[from] OrderIdError),
    #[error("Order {0} belongs to another user")]
    OrderOwnedByAnotherUser(OrderId),
    #[error("Order was stored but could not be queued. {0}")]
    Submission(#[from] SubmissionError),
    #[error("{0}")]
    Storage(StorageError),
}

impl From<StorageError> for OrderFlowError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::DuplicateOrder(order_id) => OrderFlowError::OrderOwnedByAnotherUser(order_id),
            e => OrderFlowError::Storage(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountApiError {
    #[error("Invalid order number. {0}")]
    InvalidOrderNumber(#[from] OrderIdError),
    #[error("User account {0} does not exist")]
    AccountNotFound(i64),
    #[error("Insufficient balance. {available} is available, but {requested} was requested")]
    InsufficientBalance { available: Points, requested: Points },
    #[error("Order {0} has already been used")]
    OrderAlreadyUsed(OrderId),
    #[error("Invalid withdrawal amount: {0}")]
    InvalidAmount(Points),
    #[error("The login '{0}' is already in use")]
    LoginTaken(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StorageError> for AccountApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::DatabaseError(s) => AccountApiError::DatabaseError(s),
            StorageError::DuplicateOrder(order_id) => AccountApiError::OrderAlreadyUsed(order_id),
            StorageError::AccountNotFound(id) => AccountApiError::AccountNotFound(id),
            StorageError::LoginTaken(login) => AccountApiError::LoginTaken(login),
            StorageError::InsufficientBalance { available, requested } => {
                AccountApiError::InsufficientBalance { available, requested }
            },
            StorageError::InvalidAmount(sum) => AccountApiError::InvalidAmount(sum),
        }
    }
}
