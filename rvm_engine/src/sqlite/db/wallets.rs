use log::*;
use rvm_common::{Grams, Money};
use sqlx::SqliteConnection;

use crate::{
    db_types::{MerchantWallet, TxKind},
    traits::SettlementError,
};

pub async fn wallet_for(
    user_id: i64,
    merchant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<MerchantWallet>, SettlementError> {
    let wallet = sqlx::query_as::<_, MerchantWallet>(
        "SELECT * FROM merchant_wallets WHERE user_id = ? AND merchant_id = ?",
    )
    .bind(user_id)
    .bind(merchant_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(wallet)
}

/// Credits (or debits) the wallet for one (user, merchant) pair and returns the new balance.
///
/// The mutation is a single SQL statement, so the read-modify-write is atomic no matter how many writers race.
/// The wallet row is created on first touch.
pub async fn credit(
    user_id: i64,
    merchant_id: i64,
    amount: Money,
    earnings_delta: Money,
    weight_delta: Grams,
    conn: &mut SqliteConnection,
) -> Result<Money, SettlementError> {
    let balance: i64 = sqlx::query_scalar(
        r#"INSERT INTO merchant_wallets (user_id, merchant_id, balance, total_earnings, total_weight)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (user_id, merchant_id) DO UPDATE SET
            balance = balance + excluded.balance,
            total_earnings = total_earnings + excluded.total_earnings,
            total_weight = total_weight + excluded.total_weight,
            updated_at = CURRENT_TIMESTAMP
        RETURNING balance"#,
    )
    .bind(user_id)
    .bind(merchant_id)
    .bind(amount)
    .bind(earnings_delta)
    .bind(weight_delta)
    .fetch_one(&mut *conn)
    .await?;
    trace!("💰️ Wallet ({user_id}, {merchant_id}) moved by {amount} to {}", Money::from_cents(balance));
    Ok(Money::from_cents(balance))
}

/// Appends one row to the append-only transaction log.
pub async fn append_transaction(
    user_id: i64,
    merchant_id: i64,
    amount: Money,
    balance_after: Money,
    kind: TxKind,
    description: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, SettlementError> {
    let res = sqlx::query(
        r#"INSERT INTO wallet_transactions (user_id, merchant_id, amount, balance_after, transaction_type, description)
        VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(user_id)
    .bind(merchant_id)
    .bind(amount)
    .bind(balance_after)
    .bind(kind)
    .bind(description)
    .execute(&mut *conn)
    .await?;
    Ok(res.last_insert_rowid())
}

/// Net of adjustments in the log, for the conservation audit.
///
/// Negative migration and withdrawal-sync adjustments are excluded: those are mirrored by EXTERNAL_SYNC withdrawal
/// rows, which the audit already counts. Counting both would double the debit.
pub async fn adjustment_sum(
    user_id: i64,
    merchant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Money, SettlementError> {
    let sum: i64 = sqlx::query_scalar(
        r#"SELECT COALESCE(SUM(amount), 0) FROM wallet_transactions
        WHERE user_id = ? AND merchant_id = ?
          AND (transaction_type = 'MANUAL_ADJUSTMENT'
               OR (transaction_type = 'MIGRATION_ADJUSTMENT' AND amount > 0))"#,
    )
    .bind(user_id)
    .bind(merchant_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(Money::from_cents(sum))
}

pub async fn has_transaction_of_kind(
    user_id: i64,
    merchant_id: i64,
    kind: TxKind,
    conn: &mut SqliteConnection,
) -> Result<bool, SettlementError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM wallet_transactions WHERE user_id = ? AND merchant_id = ? AND transaction_type = ?",
    )
    .bind(user_id)
    .bind(merchant_id)
    .bind(kind)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}
