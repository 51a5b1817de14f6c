use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use log::*;
use tokio::sync::Mutex;

use crate::{
    db_types::{
        InsertOrderResult,
        NewOrder,
        Order,
        OrderId,
        OrderStatusType,
        Points,
        UserAccount,
        Withdrawal,
    },
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

#[derive(Debug, Default)]
struct MemoryStore {
    users: HashMap<i64, UserAccount>,
    orders: HashMap<OrderId, Order>,
    last_user_id: i64,
    last_order_id: i64,
    closed: bool,
}

impl MemoryStore {
    fn check_open(&self) -> Result<(), StorageError> {
        if self.closed {
            Err(StorageError::DatabaseError("The in-memory database has been closed".into()))
        } else {
            Ok(())
        }
    }

    fn next_order_id(&mut self) -> i64 {
        self.last_order_id += 1;
        self.last_order_id
    }

    fn sorted_orders<F: Fn(&Order) -> bool>(&self, filter: F) -> Vec<Order> {
        let mut orders = self.orders.values().filter(|o| filter(o)).cloned().collect::<Vec<_>>();
        orders.sort_by_key(|o| (o.created_at, o.id));
        orders
    }
}

/// Storage backed by mutex-guarded maps. Cloning the handle shares the underlying store.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    store: Arc<Mutex<MemoryStore>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoyaltyDatabase for MemoryDatabase {
    fn url(&self) -> &str {
        "memory"
    }
}

#[async_trait]
impl AccrualLedger for MemoryDatabase {
    async fn update_order_by_accrual(
        &self,
        order_id: &OrderId,
        status: OrderStatusType,
        accrual: Points,
    ) -> Result<AccrualUpdate, LedgerError> {
        let mut store = self.store.lock().await;
        store.check_open().map_err(|e| LedgerError::Database(e.to_string()))?;
        let order = store.orders.get(order_id).cloned().ok_or_else(|| LedgerError::OrderNotFound(order_id.clone()))?;
        if order.status == status {
            return Ok(AccrualUpdate::Unchanged(order));
        }
        check_transition(order_id, order.status, status)?;
        let credited = accrual_credit(order.accrual, accrual);
        // Resolve the owner before mutating anything.
        let user = store
            .users
            .get_mut(&order.user_id)
            .ok_or_else(|| LedgerError::Database(format!("Order {order_id} belongs to unknown user #{}", order.user_id)))?;
        check_credit(user, credited)?;
        let now = Utc::now();
        if !credited.is_zero() {
            user.balance += credited;
            user.updated_at = now;
        }
        let previous = order.status;
        let mut updated = order;
        updated.status = status;
        updated.accrual = updated.accrual.max(accrual);
        updated.updated_at = now;
        store.orders.insert(order_id.clone(), updated.clone());
        trace!("🧠️ Order {order_id} is now {status}. {credited} credited");
        Ok(AccrualUpdate::Applied { previous, order: updated, credited })
    }
}

#[async_trait]
impl OrderManagement for MemoryDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, StorageError> {
        let mut store = self.store.lock().await;
        store.check_open()?;
        if let Some(existing) = store.orders.get(&order.order_id) {
            return if existing.user_id == order.user_id {
                Ok(InsertOrderResult::AlreadyExists(existing.clone()))
            } else {
                Err(StorageError::DuplicateOrder(order.order_id))
            };
        }
        if !store.users.contains_key(&order.user_id) {
            return Err(StorageError::AccountNotFound(order.user_id));
        }
        let id = store.next_order_id();
        let new_order = Order {
            id,
            order_id: order.order_id.clone(),
            user_id: order.user_id,
            status: OrderStatusType::New,
            accrual: Points::default(),
            withdrawal: Points::default(),
            created_at: order.created_at,
            updated_at: order.created_at,
        };
        store.orders.insert(order.order_id, new_order.clone());
        debug!("🧠️ Order {} inserted with id {id}", new_order.order_id);
        Ok(InsertOrderResult::Inserted(new_order))
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StorageError> {
        let store = self.store.lock().await;
        store.check_open()?;
        Ok(store.orders.get(order_id).cloned())
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, StorageError> {
        let store = self.store.lock().await;
        store.check_open()?;
        let mut orders = store.sorted_orders(|o| o.user_id == user_id);
        orders.reverse();
        Ok(orders)
    }

    async fn fetch_unfinished_orders(&self) -> Result<Vec<Order>, StorageError> {
        let store = self.store.lock().await;
        store.check_open()?;
        Ok(store.sorted_orders(|o| !o.status.is_terminal()))
    }
}

#[async_trait]
impl AccountManagement for MemoryDatabase {
    async fn create_user_account(&self, login: &str) -> Result<UserAccount, StorageError> {
        let mut store = self.store.lock().await;
        store.check_open()?;
        if store.users.values().any(|u| u.login == login) {
            return Err(StorageError::LoginTaken(login.to_string()));
        }
        store.last_user_id += 1;
        let now = Utc::now();
        let account = UserAccount {
            id: store.last_user_id,
            login: login.to_string(),
            balance: Points::default(),
            withdrawn: Points::default(),
            created_at: now,
            updated_at: now,
        };
        store.users.insert(account.id, account.clone());
        Ok(account)
    }

    async fn fetch_user_account(&self, user_id: i64) -> Result<Option<UserAccount>, StorageError> {
        let store = self.store.lock().await;
        store.check_open()?;
        Ok(store.users.get(&user_id).cloned())
    }

    async fn fetch_user_account_by_login(&self, login: &str) -> Result<Option<UserAccount>, StorageError> {
        let store = self.store.lock().await;
        store.check_open()?;
        Ok(store.users.values().find(|u| u.login == login).cloned())
    }

    async fn register_withdrawal(&self, user_id: i64, order_id: &OrderId, sum: Points) -> Result<Order, StorageError> {
        if sum.is_zero() || sum.is_negative() {
            return Err(StorageError::InvalidAmount(sum));
        }
        let mut store = self.store.lock().await;
        store.check_open()?;
        if store.orders.contains_key(order_id) {
            return Err(StorageError::DuplicateOrder(order_id.clone()));
        }
        let now = Utc::now();
        let user = store.users.get_mut(&user_id).ok_or(StorageError::AccountNotFound(user_id))?;
        if user.balance < sum {
            return Err(StorageError::InsufficientBalance { available: user.balance, requested: sum });
        }
        user.balance -= sum;
        user.withdrawn += sum;
        user.updated_at = now;
        let id = store.next_order_id();
        let order = Order {
            id,
            order_id: order_id.clone(),
            user_id,
            status: OrderStatusType::Processed,
            accrual: Points::default(),
            withdrawal: sum,
            created_at: now,
            updated_at: now,
        };
        store.orders.insert(order_id.clone(), order.clone());
        debug!("🧠️ Account #{user_id} spent {sum} on order {order_id}");
        Ok(order)
    }

    async fn fetch_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, StorageError> {
        let store = self.store.lock().await;
        store.check_open()?;
        let mut orders = store.sorted_orders(|o| o.user_id == user_id && !o.withdrawal.is_zero());
        orders.reverse();
        Ok(orders.into_iter().map(Withdrawal::from).collect())
    }
}

#[async_trait]
impl Closeable for MemoryDatabase {
    async fn close(&mut self) -> Result<(), StorageError> {
        self.store.lock().await.closed = true;
        debug!("🧠️ In-memory database closed");
        Ok(())
    }
}
