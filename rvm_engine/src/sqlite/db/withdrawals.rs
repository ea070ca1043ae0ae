use log::*;
use rvm_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Withdrawal, WithdrawalStatus},
    traits::SettlementError,
};

pub async fn withdrawal_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Withdrawal>, SettlementError> {
    let row = sqlx::query_as::<_, Withdrawal>("SELECT * FROM withdrawals WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// Records a payout that already happened on the vendor's side. Bookkeeping only; the wallet debit is written by the
/// caller as part of the same transaction.
pub async fn insert_external_sync(
    user_id: i64,
    merchant_id: i64,
    amount: Money,
    note: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, SettlementError> {
    let res = sqlx::query(
        r#"INSERT INTO withdrawals (user_id, merchant_id, amount, status, admin_note)
        VALUES (?, ?, ?, 'EXTERNAL_SYNC', ?)"#,
    )
    .bind(user_id)
    .bind(merchant_id)
    .bind(amount)
    .bind(note)
    .execute(&mut *conn)
    .await?;
    debug!("📤️ External withdrawal of {amount} recorded for user {user_id}");
    Ok(res.last_insert_rowid())
}

pub async fn update_status(
    id: i64,
    status: WithdrawalStatus,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Withdrawal>, SettlementError> {
    sqlx::query(
        "UPDATE withdrawals SET status = ?, admin_note = COALESCE(?, admin_note), updated_at = CURRENT_TIMESTAMP \
         WHERE id = ?",
    )
    .bind(status)
    .bind(note)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    withdrawal_by_id(id, conn).await
}

/// Sum of non-REJECTED withdrawals for one (user, merchant), for the conservation audit.
pub async fn active_withdrawal_sum(
    user_id: i64,
    merchant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Money, SettlementError> {
    let sum: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM withdrawals WHERE user_id = ? AND merchant_id = ? AND status != \
         'REJECTED'",
    )
    .bind(user_id)
    .bind(merchant_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(Money::from_cents(sum))
}
