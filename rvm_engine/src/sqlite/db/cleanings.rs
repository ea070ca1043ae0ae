use chrono::{Duration, Utc};
use log::*;
use rvm_common::Grams;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CleaningRecord, ReviewStatus, WasteType},
    helpers::cleaning,
    traits::{LedgerError, SettlementError},
};

pub async fn cleaning_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<CleaningRecord>, SettlementError> {
    let row = sqlx::query_as::<_, CleaningRecord>("SELECT * FROM cleaning_records WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// True when the detected cleaning is a duplicate of one already recorded: either any record for the device within
/// the cooldown window, or one with the same collected weight since the previous record.
async fn is_duplicate(
    device_no: &str,
    collected: Grams,
    cooldown: Duration,
    conn: &mut SqliteConnection,
) -> Result<bool, LedgerError> {
    let cutoff = Utc::now() - cooldown;
    let count: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM cleaning_records
        WHERE device_no = ?
          AND (cleaned_at > ?
               OR (weight_collected = ? AND id = (SELECT MAX(id) FROM cleaning_records WHERE device_no = ?)))"#,
    )
    .bind(device_no)
    .bind(cutoff)
    .bind(collected)
    .bind(device_no)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
    Ok(count > 0)
}

/// Inserts a cleaning record for a detected bin emptying, unless it duplicates a recent one.
/// Returns the new record, or `None` when deduped.
pub async fn record_cleaning_if_new(
    device_no: &str,
    merchant_id: i64,
    waste_type: WasteType,
    collected: Grams,
    photo_url: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<CleaningRecord>, LedgerError> {
    if is_duplicate(device_no, collected, cleaning::cleaning_cooldown(), conn).await? {
        debug!("🧹️ Cleaning of {collected} at {device_no} looks like a duplicate. Skipping.");
        return Ok(None);
    }
    let now = Utc::now();
    let res = sqlx::query(
        r#"INSERT INTO cleaning_records (device_no, merchant_id, waste_type, weight_collected, photo_url, cleaned_at)
        VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(device_no)
    .bind(merchant_id)
    .bind(waste_type)
    .bind(collected)
    .bind(photo_url)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
    let id = res.last_insert_rowid();
    info!("🧹️ Recorded cleaning #{id}: {collected} of {waste_type} collected at {device_no}");
    let record = cleaning_by_id(id, conn).await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
    Ok(record)
}

pub async fn review_cleaning(
    id: i64,
    status: ReviewStatus,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<CleaningRecord>, SettlementError> {
    sqlx::query("UPDATE cleaning_records SET status = ?, admin_note = COALESCE(?, admin_note) WHERE id = ?")
        .bind(status)
        .bind(note)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    cleaning_by_id(id, conn).await
}
