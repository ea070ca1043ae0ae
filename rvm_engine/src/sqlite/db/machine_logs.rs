use sqlx::SqliteConnection;

use crate::traits::LedgerError;

/// Appends a raw webhook payload to the machine log. The log is the forensic record of everything the vendor ever
/// sent, kept verbatim and append-only.
pub async fn insert_log(
    device_no: Option<&str>,
    event_type: &str,
    vendor_user_no: Option<&str>,
    payload: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, LedgerError> {
    let res = sqlx::query("INSERT INTO machine_logs (device_no, event_type, vendor_user_no, payload) VALUES (?, ?, ?, ?)")
        .bind(device_no)
        .bind(event_type)
        .bind(vendor_user_no)
        .bind(payload)
        .execute(&mut *conn)
        .await?;
    Ok(res.last_insert_rowid())
}
