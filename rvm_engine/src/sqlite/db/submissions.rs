use chrono::{DateTime, Utc};
use log::*;
use rvm_common::{Grams, Money};
use sqlx::SqliteConnection;

use crate::{
    db_types::{EventSource, RecordId, ReviewStatus, SubmissionReview, WasteType},
    traits::{LedgerError, ReviewFilter, SettlementError},
};

pub async fn submission_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<SubmissionReview>, LedgerError> {
    let row = sqlx::query_as::<_, SubmissionReview>("SELECT * FROM submission_reviews WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn submission_by_record_id(
    record_id: &RecordId,
    conn: &mut SqliteConnection,
) -> Result<Option<SubmissionReview>, LedgerError> {
    let row = sqlx::query_as::<_, SubmissionReview>("SELECT * FROM submission_reviews WHERE vendor_record_id = ?")
        .bind(record_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// Everything needed to write one submission row.
pub struct NewSubmission {
    pub vendor_record_id: RecordId,
    pub user_id: i64,
    pub merchant_id: i64,
    pub device_no: Option<String>,
    pub waste_type: WasteType,
    pub api_weight: Grams,
    pub machine_points: Money,
    pub value: Money,
    pub rate_per_kg: f64,
    pub status: ReviewStatus,
    pub source: EventSource,
    pub photo_url: Option<String>,
    pub bin_weight_snapshot: Option<Grams>,
    pub submitted_at: DateTime<Utc>,
}

/// Inserts a submission, relying on the UNIQUE constraint on `vendor_record_id` for dedup.
///
/// Returns the row id when this call inserted, or `None` when a conflicting row already existed. The conflict is the
/// at-most-once-credit signal: the caller must treat `None` as "someone else processed this record".
pub async fn idempotent_insert(sub: &NewSubmission, conn: &mut SqliteConnection) -> Result<Option<i64>, LedgerError> {
    let reviewed_at = if sub.status == ReviewStatus::Verified { Some(Utc::now()) } else { None };
    let confirmed = if sub.status == ReviewStatus::Verified { sub.api_weight } else { Grams::default() };
    let res = sqlx::query(
        r#"INSERT INTO submission_reviews (
            vendor_record_id, user_id, merchant_id, device_no, waste_type,
            api_weight, confirmed_weight, machine_points, value, rate_per_kg,
            status, source, photo_url, bin_weight_snapshot, submitted_at, reviewed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (vendor_record_id) DO NOTHING"#,
    )
    .bind(&sub.vendor_record_id)
    .bind(sub.user_id)
    .bind(sub.merchant_id)
    .bind(&sub.device_no)
    .bind(sub.waste_type)
    .bind(sub.api_weight)
    .bind(confirmed)
    .bind(sub.machine_points)
    .bind(sub.value)
    .bind(sub.rate_per_kg)
    .bind(sub.status)
    .bind(sub.source)
    .bind(&sub.photo_url)
    .bind(sub.bin_weight_snapshot)
    .bind(sub.submitted_at)
    .bind(reviewed_at)
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        debug!("🗃️ Record {} already exists. Treating as duplicate delivery.", sub.vendor_record_id);
        Ok(None)
    } else {
        Ok(Some(res.last_insert_rowid()))
    }
}

/// Refreshes a PENDING row with newly computed classification and value, and promotes it to VERIFIED.
///
/// The WHERE clause re-checks the status, so a concurrent settlement of the same row loses cleanly.
pub async fn promote_pending(
    id: i64,
    waste_type: WasteType,
    confirmed_weight: Grams,
    value: Money,
    rate_per_kg: f64,
    conn: &mut SqliteConnection,
) -> Result<bool, LedgerError> {
    let res = sqlx::query(
        r#"UPDATE submission_reviews SET
            waste_type = ?, confirmed_weight = ?, value = ?, rate_per_kg = ?,
            status = 'VERIFIED', reviewed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND status = 'PENDING'"#,
    )
    .bind(waste_type)
    .bind(confirmed_weight)
    .bind(value)
    .bind(rate_per_kg)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(res.rows_affected() > 0)
}

/// Settles a PENDING row as VERIFIED with an admin-confirmed weight and value.
pub async fn mark_verified(
    id: i64,
    confirmed_weight: Grams,
    value: Money,
    rate_per_kg: f64,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<bool, SettlementError> {
    let res = sqlx::query(
        r#"UPDATE submission_reviews SET
            confirmed_weight = ?, value = ?, rate_per_kg = ?, reviewer_note = COALESCE(?, reviewer_note),
            status = 'VERIFIED', reviewed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND status = 'PENDING'"#,
    )
    .bind(confirmed_weight)
    .bind(value)
    .bind(rate_per_kg)
    .bind(note)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(res.rows_affected() > 0)
}

/// Settles a PENDING row as REJECTED, zeroing the confirmed weight and value.
pub async fn mark_rejected(id: i64, reason: &str, conn: &mut SqliteConnection) -> Result<bool, SettlementError> {
    let res = sqlx::query(
        r#"UPDATE submission_reviews SET
            confirmed_weight = 0, value = 0, reviewer_note = ?,
            status = 'REJECTED', reviewed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND status = 'PENDING'"#,
    )
    .bind(reason)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn search_reviews(
    filter: ReviewFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<SubmissionReview>, SettlementError> {
    let mut where_clauses = Vec::new();
    if filter.merchant_id.is_some() {
        where_clauses.push("merchant_id = ?");
    }
    if filter.user_id.is_some() {
        where_clauses.push("user_id = ?");
    }
    if filter.status.is_some() {
        where_clauses.push("status = ?");
    }
    if filter.device_no.is_some() {
        where_clauses.push("device_no = ?");
    }
    let mut sql = "SELECT * FROM submission_reviews".to_string();
    if !where_clauses.is_empty() {
        sql = format!("{sql} WHERE {}", where_clauses.join(" AND "));
    }
    sql = format!("{sql} ORDER BY submitted_at DESC LIMIT ?");
    trace!("🗃️ Review query: {sql}");
    let mut query = sqlx::query_as::<_, SubmissionReview>(&sql);
    if let Some(m) = filter.merchant_id {
        query = query.bind(m);
    }
    if let Some(u) = filter.user_id {
        query = query.bind(u);
    }
    if let Some(s) = filter.status {
        query = query.bind(s);
    }
    if let Some(d) = filter.device_no {
        query = query.bind(d);
    }
    let rows = query.bind(filter.limit.unwrap_or(100)).fetch_all(&mut *conn).await?;
    Ok(rows)
}

/// Sum of VERIFIED submission values for one (user, merchant), for the conservation audit.
pub async fn verified_value_sum(
    user_id: i64,
    merchant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Money, SettlementError> {
    let sum: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(value), 0) FROM submission_reviews WHERE user_id = ? AND merchant_id = ? AND status = \
         'VERIFIED'",
    )
    .bind(user_id)
    .bind(merchant_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(Money::from_cents(sum))
}
