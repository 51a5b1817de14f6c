//! `SqliteDatabase` is a concrete implementation of a loyalty gateway storage backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use async_trait::async_trait;
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{db_url, new_pool, orders, user_accounts};
use crate::{
    db_types::{InsertOrderResult, NewOrder, Order, OrderId, OrderStatusType, Points, UserAccount, Withdrawal},
    traits::{
        accrual_credit,
        check_credit,
        check_transition,
        AccountManagement,
        AccrualLedger,
        AccrualUpdate,
        Closeable,
        LedgerError,
        LoyaltyDatabase,
        OrderManagement,
        StorageError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `LPG_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        debug!("🗃️ Connected to SQLite database at {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date using the migrations embedded in this crate.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}

impl LoyaltyDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }
}

#[async_trait]
impl AccrualLedger for SqliteDatabase {
    async fn update_order_by_accrual(
        &self,
        order_id: &OrderId,
        status: OrderStatusType,
        accrual: Points,
    ) -> Result<AccrualUpdate, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::lock_order(order_id, &mut tx).await?.ok_or_else(|| LedgerError::OrderNotFound(order_id.clone()))?;
        if order.status == status {
            trace!("🗃️ Order {order_id} is already {status}. Nothing to do");
            return Ok(AccrualUpdate::Unchanged(order));
        }
        check_transition(order_id, order.status, status)?;
        let credited = accrual_credit(order.accrual, accrual);
        if !credited.is_zero() {
            let owner = user_accounts::user_account_by_id(order.user_id, &mut tx).await?.ok_or_else(|| {
                LedgerError::Database(format!("Order {order_id} belongs to unknown user #{}", order.user_id))
            })?;
            check_credit(&owner, credited)?;
        }
        let new_accrual = order.accrual.max(accrual);
        let updated = orders::update_accrual(order_id, status, new_accrual, &mut tx).await?;
        if !credited.is_zero() {
            user_accounts::credit_balance(order.user_id, credited, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order {order_id} moved from {} to {status}. {credited} credited to #{}", order.status, order.user_id);
        Ok(AccrualUpdate::Applied { previous: order.status, order: updated, credited })
    }
}

#[async_trait]
impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, StorageError> {
        let mut tx = self.pool.begin().await?;
        if let Some(existing) = orders::lock_order(&order.order_id, &mut tx).await? {
            return if existing.user_id == order.user_id {
                Ok(InsertOrderResult::AlreadyExists(existing))
            } else {
                Err(StorageError::DuplicateOrder(order.order_id))
            };
        }
        if user_accounts::user_account_by_id(order.user_id, &mut tx).await?.is_none() {
            return Err(StorageError::AccountNotFound(order.user_id));
        }
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(InsertOrderResult::Inserted(order))
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_unfinished_orders(&self) -> Result<Vec<Order>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_unfinished_orders(&mut conn).await?;
        Ok(orders)
    }
}

#[async_trait]
impl AccountManagement for SqliteDatabase {
    async fn create_user_account(&self, login: &str) -> Result<UserAccount, StorageError> {
        let mut tx = self.pool.begin().await?;
        if user_accounts::lock_account_by_login(login, &mut tx).await?.is_some() {
            return Err(StorageError::LoginTaken(login.to_string()));
        }
        let account = user_accounts::create_account(login, &mut tx).await?;
        tx.commit().await?;
        Ok(account)
    }

    async fn fetch_user_account(&self, user_id: i64) -> Result<Option<UserAccount>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let account = user_accounts::user_account_by_id(user_id, &mut conn).await?;
        Ok(account)
    }

    async fn fetch_user_account_by_login(&self, login: &str) -> Result<Option<UserAccount>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let account = user_accounts::user_account_by_login(login, &mut conn).await?;
        Ok(account)
    }

    async fn register_withdrawal(&self, user_id: i64, order_id: &OrderId, sum: Points) -> Result<Order, StorageError> {
        if sum.is_zero() || sum.is_negative() {
            return Err(StorageError::InvalidAmount(sum));
        }
        let mut tx = self.pool.begin().await?;
        let account =
            user_accounts::lock_account(user_id, &mut tx).await?.ok_or(StorageError::AccountNotFound(user_id))?;
        if orders::fetch_order_by_order_id(order_id, &mut tx).await?.is_some() {
            return Err(StorageError::DuplicateOrder(order_id.clone()));
        }
        if user_accounts::debit_balance(user_id, sum, &mut tx).await?.is_none() {
            return Err(StorageError::InsufficientBalance { available: account.balance, requested: sum });
        }
        let order = orders::insert_withdrawal(user_id, order_id, sum, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Account #{user_id} spent {sum} on order {order_id}");
        Ok(order)
    }

    async fn fetch_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_withdrawals_for_user(user_id, &mut conn).await?;
        Ok(orders.into_iter().map(Withdrawal::from).collect())
    }
}

#[async_trait]
impl Closeable for SqliteDatabase {
    async fn close(&mut self) -> Result<(), StorageError> {
        self.pool.close().await;
        info!("🗃️ Database connection pool closed");
        Ok(())
    }
}
