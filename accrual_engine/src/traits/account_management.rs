use async_trait::async_trait;
use thiserror::Error;

use crate::db_types::{Order, OrderId, Points, UserAccount, Withdrawal};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} has already been submitted by another user")]
    DuplicateOrder(OrderId),
    #[error("User account {0} does not exist")]
    AccountNotFound(i64),
    #[error("The login '{0}' is already in use")]
    LoginTaken(String),
    #[error("Insufficient balance. {available} is available, but {requested} was requested")]
    InsufficientBalance { available: Points, requested: Points },
    #[error("Invalid withdrawal amount: {0}")]
    InvalidAmount(Points),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::DatabaseError(e.to_string())
    }
}

/// The `AccountManagement` trait defines behaviour for managing user accounts and their point balances.
///
/// Balances only ever increase through accrual (see [`crate::traits::AccrualLedger`]) and only ever decrease through
/// [`AccountManagement::register_withdrawal`].
#[async_trait]
pub trait AccountManagement {
    /// Creates a new account with a zero balance.
    async fn create_user_account(&self, login: &str) -> Result<UserAccount, StorageError>;

    /// Fetches the user account associated with the given account id. If no account exists, `None` is returned.
    async fn fetch_user_account(&self, user_id: i64) -> Result<Option<UserAccount>, StorageError>;

    async fn fetch_user_account_by_login(&self, login: &str) -> Result<Option<UserAccount>, StorageError>;

    /// Spends `sum` points from the user's balance against the order `order_id`. In a single atomic transaction:
    /// * the withdrawal is recorded against the order number, which must not already exist,
    /// * the balance is reduced by `sum`,
    /// * the lifetime `withdrawn` total is increased by `sum`.
    ///
    /// Fails with [`StorageError::InsufficientBalance`] (and changes nothing) if the balance is smaller than `sum`.
    async fn register_withdrawal(&self, user_id: i64, order_id: &OrderId, sum: Points) -> Result<Order, StorageError>;

    /// All withdrawals made by the user, most recent first.
    async fn fetch_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, StorageError>;
}
