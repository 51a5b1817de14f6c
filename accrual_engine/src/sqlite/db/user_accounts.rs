use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{Points, UserAccount};

pub async fn create_account(login: &str, conn: &mut SqliteConnection) -> Result<UserAccount, sqlx::Error> {
    let now = Utc::now();
    let account: UserAccount = sqlx::query_as(
        r#"
            INSERT INTO users (login, created_at, updated_at) VALUES ($1, $2, $2)
            RETURNING *;
        "#,
    )
    .bind(login)
    .bind(now)
    .fetch_one(conn)
    .await?;
    trace!("🧑️ Created account #{} for {login}", account.id);
    Ok(account)
}

pub async fn user_account_by_id(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<UserAccount>, sqlx::Error> {
    let account = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(account)
}

pub async fn user_account_by_login(
    login: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<UserAccount>, sqlx::Error> {
    let account = sqlx::query_as("SELECT * FROM users WHERE login = $1").bind(login).fetch_optional(conn).await?;
    Ok(account)
}

/// As [`super::orders::lock_order`], for the account with the given id.
pub async fn lock_account(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<UserAccount>, sqlx::Error> {
    let account = sqlx::query_as("UPDATE users SET updated_at = updated_at WHERE id = $1 RETURNING *")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

/// As [`super::orders::lock_order`], for the account with the given login.
pub async fn lock_account_by_login(
    login: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<UserAccount>, sqlx::Error> {
    let account = sqlx::query_as("UPDATE users SET updated_at = updated_at WHERE login = $1 RETURNING *")
        .bind(login)
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

/// Adds `amount` to the user's balance.
pub async fn credit_balance(
    user_id: i64,
    amount: Points,
    conn: &mut SqliteConnection,
) -> Result<UserAccount, sqlx::Error> {
    let account = sqlx::query_as(
        r#"
            UPDATE users SET balance = balance + $1, updated_at = $2
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(Utc::now())
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    trace!("🧑️ Credited {amount} to account #{user_id}");
    Ok(account)
}

/// Moves `amount` from the user's balance to their withdrawn total, but only if the balance covers it. Returns `None`
/// (and changes nothing) if it does not.
pub async fn debit_balance(
    user_id: i64,
    amount: Points,
    conn: &mut SqliteConnection,
) -> Result<Option<UserAccount>, sqlx::Error> {
    let account = sqlx::query_as(
        r#"
            UPDATE users SET balance = balance - $1, withdrawn = withdrawn + $1, updated_at = $2
            WHERE id = $3 AND balance >= $1
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(Utc::now())
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(account)
}
