use chrono::{DateTime, Duration, Utc};
use log::*;
use rvm_common::{Grams, Money};
use sqlx::SqliteConnection;

use crate::{
    db_types::User,
    traits::{LedgerError, ProfileUpdate},
};

pub async fn user_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, LedgerError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?").bind(id).fetch_optional(&mut *conn).await?;
    Ok(user)
}

pub async fn user_by_vendor_no(vendor_no: &str, conn: &mut SqliteConnection) -> Result<Option<User>, LedgerError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE vendor_user_no = ?")
        .bind(vendor_no)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

pub async fn user_by_phone(phone: &str, conn: &mut SqliteConnection) -> Result<Option<User>, LedgerError> {
    let user =
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = ?").bind(phone).fetch_optional(&mut *conn).await?;
    Ok(user)
}

/// The identity resolver. Matches by vendor number first, then phone; backfills missing identifiers on the matched
/// row without overwriting present values; inserts a ghost user otherwise.
pub async fn fetch_or_create_user(
    vendor_user_no: Option<&str>,
    phone: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<User, LedgerError> {
    let vendor_user_no = vendor_user_no.map(str::trim).filter(|s| !s.is_empty());
    let phone = phone.map(str::trim).filter(|s| !s.is_empty());
    if vendor_user_no.is_none() && phone.is_none() {
        return Err(LedgerError::IdentityUnresolvable);
    }
    if let Some(vno) = vendor_user_no {
        if let Some(user) = user_by_vendor_no(vno, conn).await? {
            return backfill_identifiers(user, None, phone, conn).await;
        }
    }
    if let Some(p) = phone {
        if let Some(user) = user_by_phone(p, conn).await? {
            return backfill_identifiers(user, vendor_user_no, None, conn).await;
        }
    }
    let inserted = sqlx::query("INSERT INTO users (vendor_user_no, phone) VALUES (?, ?)")
        .bind(vendor_user_no)
        .bind(phone)
        .execute(&mut *conn)
        .await;
    match inserted {
        Ok(res) => {
            let id = res.last_insert_rowid();
            debug!("🧑️ Created ghost user #{id} for vendor_no={vendor_user_no:?} phone={phone:?}");
            user_by_id(id, conn).await?.ok_or(LedgerError::UserNotFound(id))
        },
        // A concurrent insert for the same identity beat us to it. Fetch the winner.
        Err(e) if is_unique_violation(&e) => {
            if let Some(vno) = vendor_user_no {
                if let Some(user) = user_by_vendor_no(vno, conn).await? {
                    return Ok(user);
                }
            }
            if let Some(p) = phone {
                if let Some(user) = user_by_phone(p, conn).await? {
                    return Ok(user);
                }
            }
            Err(e.into())
        },
        Err(e) => Err(e.into()),
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error().map(|d| matches!(d.kind(), sqlx::error::ErrorKind::UniqueViolation)).unwrap_or(false)
}

async fn backfill_identifiers(
    user: User,
    vendor_user_no: Option<&str>,
    phone: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<User, LedgerError> {
    let fill_vno = vendor_user_no.filter(|_| user.vendor_user_no.is_none());
    let fill_phone = phone.filter(|_| user.phone.is_none());
    if fill_vno.is_none() && fill_phone.is_none() {
        return Ok(user);
    }
    sqlx::query(
        "UPDATE users SET vendor_user_no = COALESCE(vendor_user_no, ?), phone = COALESCE(phone, ?), updated_at = \
         CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(fill_vno)
    .bind(fill_phone)
    .bind(user.id)
    .execute(&mut *conn)
    .await?;
    trace!("🧑️ Backfilled identifiers on user #{}", user.id);
    user_by_id(user.id, conn).await?.ok_or(LedgerError::UserNotFound(user.id))
}

/// Merges vendor profile data into the user row. Empty strings are treated as absent and never overwrite.
pub async fn sync_profile(
    user_id: i64,
    update: ProfileUpdate,
    conn: &mut SqliteConnection,
) -> Result<User, LedgerError> {
    let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    sqlx::query(
        r#"UPDATE users SET
            nickname = COALESCE(?, nickname),
            avatar_url = COALESCE(?, avatar_url),
            card_no = COALESCE(?, card_no),
            vendor_user_no = COALESCE(vendor_user_no, ?),
            vendor_internal_id = COALESCE(?, vendor_internal_id),
            lifetime_points = COALESCE(?, lifetime_points),
            total_weight = COALESCE(?, total_weight),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?"#,
    )
    .bind(clean(update.nickname))
    .bind(clean(update.avatar_url))
    .bind(clean(update.card_no))
    .bind(clean(update.vendor_user_no))
    .bind(clean(update.vendor_internal_id))
    .bind(update.lifetime_points)
    .bind(update.total_weight)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    user_by_id(user_id, conn).await?.ok_or(LedgerError::UserNotFound(user_id))
}

/// Adds a verified deposit to the user's lifetime totals.
pub async fn incr_lifetime_totals(
    user_id: i64,
    points: Money,
    weight: Grams,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    sqlx::query(
        "UPDATE users SET lifetime_points = lifetime_points + ?, total_weight = total_weight + ?, updated_at = \
         CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(points)
    .bind(weight)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Active users with a phone, due for a history sync. Never-synced users come first, then oldest-synced.
pub async fn harvest_candidates(
    batch_size: i64,
    cooldown: Duration,
    force: bool,
    conn: &mut SqliteConnection,
) -> Result<Vec<User>, LedgerError> {
    let cutoff = Utc::now() - cooldown;
    let users = sqlx::query_as::<_, User>(
        r#"SELECT * FROM users
        WHERE is_active AND phone IS NOT NULL
          AND (? OR last_synced_at IS NULL OR last_synced_at < ?)
        ORDER BY last_synced_at IS NOT NULL, last_synced_at ASC
        LIMIT ?"#,
    )
    .bind(force)
    .bind(cutoff)
    .bind(batch_size)
    .fetch_all(&mut *conn)
    .await?;
    Ok(users)
}

/// The harvester's optimistic lease. Advances `last_synced_at` only when the user is still due, so a concurrent
/// run that got there first wins and this caller skips the user.
pub async fn claim_user_for_sync(
    user_id: i64,
    cooldown: Duration,
    force: bool,
    conn: &mut SqliteConnection,
) -> Result<bool, LedgerError> {
    let now = Utc::now();
    let cutoff: DateTime<Utc> = now - cooldown;
    let res = sqlx::query(
        "UPDATE users SET last_synced_at = ? WHERE id = ? AND (? OR last_synced_at IS NULL OR last_synced_at < ?)",
    )
    .bind(now)
    .bind(user_id)
    .bind(force)
    .bind(cutoff)
    .execute(&mut *conn)
    .await?;
    Ok(res.rows_affected() > 0)
}
