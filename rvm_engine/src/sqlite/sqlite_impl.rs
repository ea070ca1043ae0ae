//! `SqliteDatabase` is a concrete implementation of an RVM rewards engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the traits defined in the [`crate::traits`] module.
use std::fmt::Debug;

use chrono::Duration;
use log::*;
use rvm_common::{Grams, Money};
use sqlx::SqlitePool;

use super::db::{cleanings, db_url, machine_logs, machines, new_pool, submissions, users, wallets, withdrawals};
use crate::{
    db_types::{
        CleaningRecord,
        DisposalEvent,
        EventSource,
        Machine,
        MerchantWallet,
        RecordId,
        ReviewStatus,
        SubmissionReview,
        TxKind,
        User,
        WasteType,
        Withdrawal,
        WithdrawalStatus,
        DEFAULT_MERCHANT_ID,
    },
    helpers::{ids, rates},
    sqlite::db::submissions::NewSubmission,
    traits::{
        LedgerError,
        ProfileUpdate,
        ReconciliationDatabase,
        ReviewFilter,
        SettlementError,
        SettlementManagement,
        SubmissionOutcome,
        WalletAudit,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl ReconciliationDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn process_event(&self, event: DisposalEvent, source: EventSource) -> Result<SubmissionOutcome, LedgerError> {
        let record_id = match ids::normalize_record_id(event.record_id.as_deref()) {
            Some(id) => id,
            None => {
                let id = ids::fallback_record_id(event.submitted_at, event.weight);
                trace!("🗃️ Event without a usable record id. Synthesized {id}.");
                id
            },
        };
        let mut tx = self.pool.begin().await?;
        let machine = match event.device_no.as_deref() {
            Some(d) => machines::machine_by_device_no(d, &mut tx).await?,
            None => None,
        };
        let waste_type = WasteType::detect(event.raw_label.as_deref());
        let rate = rates::resolve_rate(machine.as_ref(), waste_type, event.weight, event.points);
        let value = rates::value_for(event.weight, rate);

        if let Some(existing) = submissions::submission_by_record_id(&record_id, &mut tx).await? {
            let outcome = match existing.status {
                ReviewStatus::Pending => {
                    let promoted =
                        submissions::promote_pending(existing.id, waste_type, event.weight, value, rate, &mut tx)
                            .await?;
                    if promoted {
                        settle_into_wallet(
                            existing.user_id,
                            existing.merchant_id,
                            value,
                            event.points,
                            event.weight,
                            &record_id,
                            &mut tx,
                        )
                        .await?;
                        debug!("🗃️ Record {record_id} promoted from PENDING to VERIFIED at {value}");
                        let row = refetch(existing.id, &mut tx).await?;
                        SubmissionOutcome::Promoted(row)
                    } else {
                        let row = refetch(existing.id, &mut tx).await?;
                        SubmissionOutcome::AlreadyProcessed(row)
                    }
                },
                _ => {
                    trace!("🗃️ Record {record_id} is already {}. Duplicate delivery ignored.", existing.status);
                    SubmissionOutcome::AlreadyProcessed(existing)
                },
            };
            tx.commit().await?;
            return Ok(outcome);
        }

        let user = users::fetch_or_create_user(event.vendor_user_no.as_deref(), event.phone.as_deref(), &mut tx).await?;
        let merchant_id = machine.as_ref().map(|m| m.merchant_id).unwrap_or(DEFAULT_MERCHANT_ID);
        // Nonzero vendor points (or a nonzero computed value) auto-verify; everything else waits for review.
        let status = if !event.points.is_zero() || !value.is_zero() {
            ReviewStatus::Verified
        } else {
            ReviewStatus::Pending
        };
        let sub = NewSubmission {
            vendor_record_id: record_id.clone(),
            user_id: user.id,
            merchant_id,
            device_no: event.device_no.clone(),
            waste_type,
            api_weight: event.weight,
            machine_points: event.points,
            value,
            rate_per_kg: rate,
            status,
            source,
            photo_url: event.photo_url.clone(),
            bin_weight_snapshot: event.bin_snapshot,
            submitted_at: event.submitted_at,
        };
        let outcome = match submissions::idempotent_insert(&sub, &mut tx).await? {
            Some(id) => {
                if status == ReviewStatus::Verified {
                    settle_into_wallet(user.id, merchant_id, value, event.points, event.weight, &record_id, &mut tx)
                        .await?;
                }
                debug!("🗃️ Record {record_id} saved as {status} ({}, {} @ {rate}/kg = {value})", waste_type, event.weight);
                SubmissionOutcome::Inserted(refetch(id, &mut tx).await?)
            },
            // Lost the insert race. The winner's row is authoritative.
            None => {
                let row = submissions::submission_by_record_id(&record_id, &mut tx)
                    .await?
                    .ok_or_else(|| LedgerError::DatabaseError(format!("Record {record_id} vanished mid-transaction")))?;
                SubmissionOutcome::AlreadyProcessed(row)
            },
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn fetch_or_create_user(
        &self,
        vendor_user_no: Option<&str>,
        phone: Option<&str>,
    ) -> Result<User, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_or_create_user(vendor_user_no, phone, &mut conn).await
    }

    async fn sync_user_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<User, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::sync_profile(user_id, update, &mut conn).await
    }

    async fn raw_log(
        &self,
        device_no: Option<&str>,
        event_type: &str,
        vendor_user_no: Option<&str>,
        payload: &str,
    ) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        machine_logs::insert_log(device_no, event_type, vendor_user_no, payload, &mut conn).await?;
        Ok(())
    }

    async fn fetch_machine(&self, device_no: &str) -> Result<Option<Machine>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        machines::machine_by_device_no(device_no, &mut conn).await
    }

    async fn active_machines(&self) -> Result<Vec<Machine>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        machines::active_machines(&mut conn).await
    }

    async fn observe_bin_weight(
        &self,
        device_no: &str,
        position: i64,
        waste_type: WasteType,
        observed: Grams,
        threshold: Grams,
        min_delta: Grams,
    ) -> Result<Option<CleaningRecord>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let machine = match machines::machine_by_device_no(device_no, &mut tx).await? {
            Some(m) => m,
            // No stored snapshot to compare against; nothing to detect.
            None => return Ok(None),
        };
        let previous = machines::bin_snapshot(&machine, position);
        let record = match crate::helpers::cleaning::detect_drop(previous, observed, threshold) {
            Some(collected) => {
                cleanings::record_cleaning_if_new(device_no, machine.merchant_id, waste_type, collected, None, &mut tx)
                    .await?
            },
            None => None,
        };
        machines::update_bin_snapshot(machine.id, position, previous, observed, min_delta, &mut tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn harvest_candidates(
        &self,
        batch_size: i64,
        cooldown: Duration,
        force: bool,
    ) -> Result<Vec<User>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::harvest_candidates(batch_size, cooldown, force, &mut conn).await
    }

    async fn claim_user_for_sync(&self, user_id: i64, cooldown: Duration, force: bool) -> Result<bool, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::claim_user_for_sync(user_id, cooldown, force, &mut conn).await
    }
}

/// Credits a verified deposit into the wallet, logs the transaction and bumps the user's lifetime totals.
/// The wallet takes the monetary `value`; the lifetime tally takes the machine's own `points`.
/// Must run inside the caller's transaction.
async fn settle_into_wallet(
    user_id: i64,
    merchant_id: i64,
    value: Money,
    points: Money,
    weight: Grams,
    record_id: &RecordId,
    conn: &mut sqlx::SqliteConnection,
) -> Result<(), LedgerError> {
    let balance = wallets::credit(user_id, merchant_id, value, value, weight, conn)
        .await
        .map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
    wallets::append_transaction(
        user_id,
        merchant_id,
        value,
        balance,
        TxKind::RecycleEarning,
        &format!("Recycling earnings for record {record_id}"),
        conn,
    )
    .await
    .map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
    users::incr_lifetime_totals(user_id, points, weight, conn).await?;
    Ok(())
}

async fn refetch(id: i64, conn: &mut sqlx::SqliteConnection) -> Result<SubmissionReview, LedgerError> {
    submissions::submission_by_id(id, conn)
        .await?
        .ok_or_else(|| LedgerError::DatabaseError(format!("Submission {id} vanished mid-transaction")))
}

impl SettlementManagement for SqliteDatabase {
    async fn verify_submission(
        &self,
        review_id: i64,
        final_weight: Option<Grams>,
        rate_override: Option<f64>,
        note: Option<&str>,
    ) -> Result<SubmissionReview, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let row = submissions::submission_by_id(review_id, &mut tx)
            .await
            .map_err(|e| SettlementError::DatabaseError(e.to_string()))?
            .ok_or(SettlementError::ReviewNotFound(review_id))?;
        if row.status != ReviewStatus::Pending {
            return Err(SettlementError::NotPending { id: review_id, status: row.status });
        }
        let weight = final_weight.unwrap_or(row.api_weight);
        let rate = rate_override.unwrap_or(row.rate_per_kg);
        let value = rates::value_for(weight, rate);
        let updated = submissions::mark_verified(review_id, weight, value, rate, note, &mut tx).await?;
        if !updated {
            // Raced with another settlement of the same row.
            return Err(SettlementError::NotPending { id: review_id, status: row.status });
        }
        settle_into_wallet(row.user_id, row.merchant_id, value, row.machine_points, weight, &row.vendor_record_id, &mut tx)
            .await
            .map_err(|e| SettlementError::DatabaseError(e.to_string()))?;
        let result = refetch(review_id, &mut tx).await.map_err(|e| SettlementError::DatabaseError(e.to_string()))?;
        tx.commit().await?;
        info!("✅️ Review #{review_id} verified: {weight} at {rate}/kg settles {value}");
        Ok(result)
    }

    async fn reject_submission(&self, review_id: i64, reason: &str) -> Result<SubmissionReview, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let row = submissions::submission_by_id(review_id, &mut tx)
            .await
            .map_err(|e| SettlementError::DatabaseError(e.to_string()))?
            .ok_or(SettlementError::ReviewNotFound(review_id))?;
        if row.status != ReviewStatus::Pending {
            return Err(SettlementError::NotPending { id: review_id, status: row.status });
        }
        submissions::mark_rejected(review_id, reason, &mut tx).await?;
        let result = refetch(review_id, &mut tx).await.map_err(|e| SettlementError::DatabaseError(e.to_string()))?;
        tx.commit().await?;
        info!("🚫️ Review #{review_id} rejected: {reason}");
        Ok(result)
    }

    async fn adjust_balance(
        &self,
        user_id: i64,
        merchant_id: i64,
        amount: Money,
        kind: TxKind,
        description: &str,
    ) -> Result<Money, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let balance = wallets::credit(user_id, merchant_id, amount, Money::default(), Grams::default(), &mut tx).await?;
        wallets::append_transaction(user_id, merchant_id, amount, balance, kind, description, &mut tx).await?;
        let external_payout = matches!(kind, TxKind::WithdrawalSync | TxKind::MigrationAdjustment)
            && amount < Money::default();
        if external_payout {
            withdrawals::insert_external_sync(user_id, merchant_id, amount.abs(), description, &mut tx).await?;
        }
        tx.commit().await?;
        info!("💰️ Adjusted wallet ({user_id}, {merchant_id}) by {amount} [{kind}]. New balance {balance}");
        Ok(balance)
    }

    async fn fetch_wallet(&self, user_id: i64, merchant_id: i64) -> Result<Option<MerchantWallet>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        wallets::wallet_for(user_id, merchant_id, &mut conn).await
    }

    async fn update_withdrawal_status(
        &self,
        withdrawal_id: i64,
        status: WithdrawalStatus,
        note: Option<&str>,
    ) -> Result<Withdrawal, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let row = withdrawals::withdrawal_by_id(withdrawal_id, &mut tx)
            .await?
            .ok_or(SettlementError::WithdrawalNotFound(withdrawal_id))?;
        if row.status == status {
            return Ok(row);
        }
        if status == WithdrawalStatus::Rejected {
            // The amount goes back to the wallet; the rejected row drops out of the conservation sum.
            let balance =
                wallets::credit(row.user_id, row.merchant_id, row.amount, Money::default(), Grams::default(), &mut tx)
                    .await?;
            wallets::append_transaction(
                row.user_id,
                row.merchant_id,
                row.amount,
                balance,
                TxKind::WithdrawalSync,
                &format!("Refund for rejected withdrawal #{withdrawal_id}"),
                &mut tx,
            )
            .await?;
        } else if row.status == WithdrawalStatus::Rejected {
            let balance =
                wallets::credit(row.user_id, row.merchant_id, -row.amount, Money::default(), Grams::default(), &mut tx)
                    .await?;
            wallets::append_transaction(
                row.user_id,
                row.merchant_id,
                -row.amount,
                balance,
                TxKind::WithdrawalSync,
                &format!("Reinstated withdrawal #{withdrawal_id}"),
                &mut tx,
            )
            .await?;
        }
        let updated = withdrawals::update_status(withdrawal_id, status, note, &mut tx)
            .await?
            .ok_or(SettlementError::WithdrawalNotFound(withdrawal_id))?;
        tx.commit().await?;
        info!("📤️ Withdrawal #{withdrawal_id} moved from {} to {status}", row.status);
        Ok(updated)
    }

    async fn review_cleaning(
        &self,
        cleaning_id: i64,
        status: ReviewStatus,
        note: Option<&str>,
    ) -> Result<CleaningRecord, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let record = cleanings::review_cleaning(cleaning_id, status, note, &mut conn)
            .await?
            .ok_or(SettlementError::CleaningNotFound(cleaning_id))?;
        info!("🧹️ Cleaning #{cleaning_id} reviewed as {status}");
        Ok(record)
    }

    async fn fetch_reviews(&self, filter: ReviewFilter) -> Result<Vec<SubmissionReview>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        submissions::search_reviews(filter, &mut conn).await
    }

    async fn wallet_audit(&self, user_id: i64, merchant_id: i64) -> Result<WalletAudit, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::wallet_for(user_id, merchant_id, &mut conn)
            .await?
            .ok_or(SettlementError::WalletNotFound { user_id, merchant_id })?;
        let earned = submissions::verified_value_sum(user_id, merchant_id, &mut conn).await?;
        let withdrawn = withdrawals::active_withdrawal_sum(user_id, merchant_id, &mut conn).await?;
        let adjustments = wallets::adjustment_sum(user_id, merchant_id, &mut conn).await?;
        let expected_balance = earned - withdrawn + adjustments;
        let consistent = wallet.balance == expected_balance;
        if !consistent {
            warn!(
                "💰️ Wallet ({user_id}, {merchant_id}) fails conservation: stored {} vs expected {expected_balance}",
                wallet.balance
            );
        }
        Ok(WalletAudit { wallet, earned, withdrawn, adjustments, expected_balance, consistent })
    }

    async fn has_migration_adjustment(&self, user_id: i64, merchant_id: i64) -> Result<bool, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        wallets::has_transaction_of_kind(user_id, merchant_id, TxKind::MigrationAdjustment, &mut conn).await
    }
}
