use log::*;
use rvm_common::Grams;
use sqlx::SqliteConnection;

use crate::{db_types::Machine, traits::LedgerError};

pub async fn machine_by_device_no(device_no: &str, conn: &mut SqliteConnection) -> Result<Option<Machine>, LedgerError> {
    let machine = sqlx::query_as::<_, Machine>("SELECT * FROM machines WHERE device_no = ?")
        .bind(device_no)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(machine)
}

pub async fn active_machines(conn: &mut SqliteConnection) -> Result<Vec<Machine>, LedgerError> {
    let machines = sqlx::query_as::<_, Machine>("SELECT * FROM machines WHERE is_active ORDER BY device_no")
        .fetch_all(&mut *conn)
        .await?;
    Ok(machines)
}

/// The last recorded fill weight for one compartment. Position numbering is the vendor's (1-based).
pub fn bin_snapshot(machine: &Machine, position: i64) -> Grams {
    match position {
        2 => machine.bin_weight_2,
        _ => machine.bin_weight_1,
    }
}

/// Persists a new fill-weight snapshot for one compartment, unless the change is within sensor noise.
pub async fn update_bin_snapshot(
    machine_id: i64,
    position: i64,
    previous: Grams,
    observed: Grams,
    min_delta: Grams,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    let delta = (observed - previous).abs();
    if delta < min_delta {
        trace!("🛢️ Snapshot for machine #{machine_id} position {position} unchanged ({observed})");
        return Ok(());
    }
    let column = if position == 2 { "bin_weight_2" } else { "bin_weight_1" };
    let sql = format!("UPDATE machines SET {column} = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?");
    sqlx::query(&sql).bind(observed).bind(machine_id).execute(&mut *conn).await?;
    trace!("🛢️ Machine #{machine_id} position {position} snapshot {previous} -> {observed}");
    Ok(())
}
