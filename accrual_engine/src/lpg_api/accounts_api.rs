//! Unifies API for accessing accounts.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderId, Points, UserAccount, Withdrawal},
    lpg_api::{account_objects::Balance, errors::AccountApiError},
    traits::AccountManagement,
};

/// The `AccountApi` provides a unified API for accessing accounts.
pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn create_account(&self, login: &str) -> Result<UserAccount, AccountApiError> {
        let account = self.db.create_user_account(login).await?;
        info!("🧑️ New account #{} created for {login}", account.id);
        Ok(account)
    }

    /// Fetches the user account for the given account id. If no account exists, `None` is returned.
    pub async fn account_by_id(&self, user_id: i64) -> Result<Option<UserAccount>, AccountApiError> {
        Ok(self.db.fetch_user_account(user_id).await?)
    }

    pub async fn account_by_login(&self, login: &str) -> Result<Option<UserAccount>, AccountApiError> {
        Ok(self.db.fetch_user_account_by_login(login).await?)
    }

    pub async fn balance(&self, user_id: i64) -> Result<Balance, AccountApiError> {
        let account = self.db.fetch_user_account(user_id).await?.ok_or(AccountApiError::AccountNotFound(user_id))?;
        Ok(Balance::from(&account))
    }

    /// Pays for order `raw_order_number` with `sum` points from the user's balance.
    ///
    /// The order number must pass the Luhn check and must not have been used before. The balance can never go
    /// negative: if it does not cover `sum`, [`AccountApiError::InsufficientBalance`] is returned and nothing changes.
    pub async fn withdraw(&self, user_id: i64, raw_order_number: &str, sum: Points) -> Result<Order, AccountApiError> {
        let order_id = OrderId::parse_luhn(raw_order_number)?;
        let order = self.db.register_withdrawal(user_id, &order_id, sum).await?;
        info!("🧑️ User #{user_id} withdrew {sum} for order {order_id}");
        Ok(order)
    }

    pub async fn withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, AccountApiError> {
        Ok(self.db.fetch_withdrawals_for_user(user_id).await?)
    }
}
