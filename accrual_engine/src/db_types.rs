use std::{fmt::Display, str::FromStr};

use accrual_client::AccrualStatus;
use chrono::{DateTime, Utc};
use log::error;
pub use lpg_common::Points;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::helpers::luhn::is_valid_luhn;

//--------------------------------------        OrderId        ---------------------------------------------------------
/// An order number. Numbers that enter the system through [`OrderId::parse_luhn`] are guaranteed to carry a valid Luhn
/// check digit; rows read back from storage are trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderIdError {
    #[error("Order number is empty")]
    Empty,
    #[error("Order number may only contain digits: {0}")]
    NotNumeric(String),
    #[error("Order number fails the Luhn check: {0}")]
    BadChecksum(String),
}

impl OrderId {
    /// Validates a user-supplied order number. Surrounding whitespace is ignored.
    pub fn parse_luhn(raw: &str) -> Result<Self, OrderIdError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(OrderIdError::Empty);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OrderIdError::NotNumeric(s.to_string()));
        }
        if !is_valid_luhn(s) {
            return Err(OrderIdError::BadChecksum(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// Where an order is in the accrual life cycle: `NEW → REGISTERED/PROCESSING → PROCESSED|INVALID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// Submitted by the user, not yet seen by the accrual service.
    New,
    /// The accrual service knows about the order.
    Registered,
    /// The accrual service is calculating points for the order.
    Processing,
    /// No points will ever be credited for the order.
    Invalid,
    /// Points have been calculated and credited.
    Processed,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Invalid)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::New => 0,
            Self::Registered => 1,
            Self::Processing => 2,
            Self::Invalid | Self::Processed => 3,
        }
    }

    /// Status may only move forward. Re-applying the current status is allowed (and is a no-op for storage), but
    /// nothing leaves a terminal state and nothing returns to `NEW`.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        *self == next || (!self.is_terminal() && next.rank() > self.rank())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Registered => "REGISTERED",
            Self::Processing => "PROCESSING",
            Self::Invalid => "INVALID",
            Self::Processed => "PROCESSED",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AccrualStatus> for OrderStatusType {
    fn from(value: AccrualStatus) -> Self {
        match value {
            AccrualStatus::Registered => Self::Registered,
            AccrualStatus::Processing => Self::Processing,
            AccrualStatus::Invalid => Self::Invalid,
            AccrualStatus::Processed => Self::Processed,
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to NEW");
            OrderStatusType::New
        })
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "REGISTERED" => Ok(Self::Registered),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub user_id: i64,
    pub status: OrderStatusType,
    pub accrual: Points,
    /// Non-zero only for orders paid (in part) with points. See [`AccountManagement::register_withdrawal`].
    ///
    /// [`AccountManagement::register_withdrawal`]: crate::traits::AccountManagement::register_withdrawal
    pub withdrawal: Points,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    /// The account that submitted the order
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(order_id: OrderId, user_id: i64) -> Self {
        Self { order_id, user_id, created_at: Utc::now() }
    }
}

/// The result of an idempotent order insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOrderResult {
    Inserted(Order),
    /// The same user has already submitted this order number.
    AlreadyExists(Order),
}

//--------------------------------------     UserAccount       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct UserAccount {
    pub id: i64,
    pub login: String,
    /// Points available to spend. Never negative.
    pub balance: Points,
    /// Lifetime total of points spent.
    pub withdrawn: Points,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      Withdrawal       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Withdrawal {
    pub order_id: OrderId,
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}

impl From<Order> for Withdrawal {
    fn from(order: Order) -> Self {
        Self { order_id: order.order_id, sum: order.withdrawal, processed_at: order.created_at }
    }
}
