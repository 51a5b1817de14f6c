use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewOrder, Order, OrderId, OrderStatusType, Points};

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut tx` as the connection argument.
///
/// The order is always stored with status `NEW` and no accrual.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (order_id, user_id, status, created_at, updated_at)
            VALUES ($1, $2, 'NEW', $3, $3)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.user_id)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order {} inserted with id {}", order.order_id, order.id);
    Ok(order)
}

/// Records a withdrawal against a new order number. Withdrawal rows are created as `PROCESSED` since there is nothing
/// for the accrual service to calculate for them.
pub async fn insert_withdrawal(
    user_id: i64,
    order_id: &OrderId,
    sum: Points,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let now = Utc::now();
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (order_id, user_id, status, withdrawal, created_at, updated_at)
            VALUES ($1, $2, 'PROCESSED', $3, $4, $4)
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(user_id)
    .bind(sum)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Withdrawal of {sum} recorded against order {order_id}");
    Ok(order)
}

/// Opens the write side of the current transaction and returns the order, if it exists.
///
/// This must be the first statement of a read-then-write transaction. Holding the write lock from the start means a
/// competing writer waits on the busy timeout, instead of failing to upgrade a read lock with `SQLITE_BUSY`.
pub async fn lock_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET updated_at = updated_at WHERE order_id = $1 RETURNING *")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn fetch_withdrawals_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders =
        sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 AND withdrawal > 0 ORDER BY created_at DESC, id DESC")
            .bind(user_id)
            .fetch_all(conn)
            .await?;
    Ok(orders)
}

/// Orders that have not reached `PROCESSED` or `INVALID`, oldest first.
pub async fn fetch_unfinished_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE status NOT IN ('PROCESSED', 'INVALID')
            ORDER BY created_at ASC, id ASC
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// Sets the status and accrual of the order. No checks are made on whether the transition is allowed; that is the
/// caller's job.
pub async fn update_accrual(
    order_id: &OrderId,
    status: OrderStatusType,
    accrual: Points,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, accrual = $2, updated_at = $3
            WHERE order_id = $4
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(accrual)
    .bind(Utc::now())
    .bind(order_id.as_str())
    .fetch_one(conn)
    .await?;
    Ok(order)
}
