use async_trait::async_trait;
use thiserror::Error;

use crate::db_types::{Order, OrderId, OrderStatusType, Points, UserAccount};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {order_id} cannot move from {from} to {to}")]
    StatusRegression { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("Crediting {credited} to account #{user_id} would overflow its balance")]
    BalanceOverflow { user_id: i64, credited: Points },
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Database(e.to_string())
    }
}

/// What an accrual update actually did to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccrualUpdate {
    /// The stored status already matched the reported one. Nothing was written and nothing was credited.
    Unchanged(Order),
    /// The order moved from `previous` to a new status. `credited` is the amount added to the owner's balance,
    /// possibly zero.
    Applied { previous: OrderStatusType, order: Order, credited: Points },
}

impl AccrualUpdate {
    pub fn order(&self) -> &Order {
        match self {
            AccrualUpdate::Unchanged(order) => order,
            AccrualUpdate::Applied { order, .. } => order,
        }
    }

    pub fn credited(&self) -> Points {
        match self {
            AccrualUpdate::Unchanged(_) => Points::default(),
            AccrualUpdate::Applied { credited, .. } => *credited,
        }
    }
}

/// The storage contract the pollers use to record accrual results.
///
/// Implementations must apply the status change and the balance credit in a single atomic unit: either both are
/// visible afterwards or neither is.
///
/// * If the stored status already equals `status`, the call is a no-op and returns [`AccrualUpdate::Unchanged`].
/// * A status that would move the order backwards, or out of a terminal state, is rejected with
///   [`LedgerError::StatusRegression`].
/// * The stored accrual never decreases. When `accrual` exceeds the stored value, the order's accrual is raised to
///   `accrual` and the difference is added to the owner's balance. For an order that has never been credited this is
///   simply `accrual`.
#[async_trait]
pub trait AccrualLedger: Send + Sync {
    async fn update_order_by_accrual(
        &self,
        order_id: &OrderId,
        status: OrderStatusType,
        accrual: Points,
    ) -> Result<AccrualUpdate, LedgerError>;
}

/// The credit to apply when the stored accrual moves from `stored` to `reported`. Never negative.
pub fn accrual_credit(stored: Points, reported: Points) -> Points {
    if reported > stored {
        reported - stored
    } else {
        Points::default()
    }
}

/// Checks the forward-only status rule, returning the error a ledger should raise if `to` is not reachable.
pub fn check_transition(order_id: &OrderId, from: OrderStatusType, to: OrderStatusType) -> Result<(), LedgerError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(LedgerError::StatusRegression { order_id: order_id.clone(), from, to })
    }
}

/// Checks that `credited` can be added to the account. The lifetime total (`balance + withdrawn`) must stay
/// representable, which also keeps every later withdrawal from overflowing `withdrawn`.
pub fn check_credit(account: &UserAccount, credited: Points) -> Result<(), LedgerError> {
    account
        .balance
        .checked_add(account.withdrawn)
        .and_then(|total| total.checked_add(credited))
        .map(|_| ())
        .ok_or(LedgerError::BalanceOverflow { user_id: account.id, credited })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn credit_is_the_positive_difference() {
        let p = Points::from_points;
        assert_eq!(accrual_credit(p(0), p(500)), p(500));
        assert_eq!(accrual_credit(p(200), p(500)), p(300));
        assert_eq!(accrual_credit(p(500), p(500)), p(0));
        assert_eq!(accrual_credit(p(500), p(100)), p(0));
    }

    #[test]
    fn credits_that_overflow_are_rejected() {
        let now = chrono::Utc::now();
        let account = UserAccount {
            id: 7,
            login: "alice".into(),
            balance: Points::from(i64::MAX - 100),
            withdrawn: Points::from(50),
            created_at: now,
            updated_at: now,
        };
        assert!(check_credit(&account, Points::from(50)).is_ok());
        let err = check_credit(&account, Points::from(51)).unwrap_err();
        assert_eq!(err, LedgerError::BalanceOverflow { user_id: 7, credited: Points::from(51) });
    }

    #[test]
    fn regressions_are_rejected() {
        let id = OrderId::from("12345678903");
        assert!(check_transition(&id, OrderStatusType::New, OrderStatusType::Processing).is_ok());
        let err = check_transition(&id, OrderStatusType::Processed, OrderStatusType::Registered).unwrap_err();
        assert_eq!(err.to_string(), "Order #12345678903 cannot move from PROCESSED to REGISTERED");
    }
}
