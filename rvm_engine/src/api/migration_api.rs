use log::*;
use rvm_common::Money;

use crate::{
    db_types::{EventSource, TxKind, DEFAULT_MERCHANT_ID},
    traits::{
        DisposalSource,
        LedgerError,
        MigrationReport,
        ProfileSource,
        ProfileUpdate,
        ReconciliationDatabase,
        SettlementManagement,
    },
};

/// Records fetched when importing a user's full history.
const IMPORT_LIMIT: usize = 50;

/// One-shot import of a user's vendor-side account into the platform: history, profile and live balance.
///
/// The import is idempotent. A prior MIGRATION_ADJUSTMENT transaction for the user marks the migration as done, and
/// a repeat call becomes a no-op reporting the current state.
#[derive(Debug, Clone)]
pub struct MigrationApi<B, S> {
    db: B,
    source: S,
}

impl<B, S> MigrationApi<B, S>
where
    B: ReconciliationDatabase + SettlementManagement,
    S: DisposalSource + ProfileSource,
{
    pub fn new(db: B, source: S) -> Self {
        Self { db, source }
    }

    pub async fn onboard(&self, phone: &str, nickname: Option<&str>) -> Result<MigrationReport, LedgerError> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(LedgerError::InvalidEvent("A phone number is required for onboarding".to_string()));
        }
        let profile = self.source.account_profile(phone, nickname.unwrap_or("New User")).await?;
        let user = self.db.fetch_or_create_user(profile.vendor_user_no.as_deref(), Some(phone)).await?;

        if self.db.has_migration_adjustment(user.id, DEFAULT_MERCHANT_ID).await? {
            info!("🧳️ User #{} was already migrated. Nothing to do.", user.id);
            let balance = self
                .db
                .fetch_wallet(user.id, DEFAULT_MERCHANT_ID)
                .await?
                .map(|w| w.balance)
                .unwrap_or_default();
            return Ok(MigrationReport {
                user_id: user.id,
                imported: 0,
                skipped: 0,
                errors: vec![],
                adjustment: Money::default(),
                final_balance: balance,
            });
        }

        // Import the vendor-side history. Rows already known (e.g. from webhooks) dedup as usual;
        // matching PENDING rows get promoted.
        let mut imported = 0;
        let mut skipped = 0;
        let mut errors = Vec::new();
        match self.source.disposal_history(phone, IMPORT_LIMIT).await {
            Ok(events) => {
                for event in events {
                    let record_id = event.record_id.clone().unwrap_or_else(|| "<synthetic>".to_string());
                    match self.db.process_event(event, EventSource::Migration).await {
                        Ok(outcome) if outcome.is_new() => imported += 1,
                        Ok(_) => skipped += 1,
                        Err(e) => errors.push(format!("record {record_id}: {e}")),
                    }
                }
            },
            Err(e) => {
                warn!("🧳️ Could not fetch history for {phone}: {e}");
                errors.push(format!("history: {e}"));
            },
        }

        let update = ProfileUpdate {
            nickname: profile.nickname.clone(),
            vendor_user_no: profile.vendor_user_no.clone(),
            ..ProfileUpdate::default()
        };
        self.db.sync_user_profile(user.id, update).await?;

        // Land the wallet exactly on the vendor's live balance. A negative adjustment means the user was paid out on
        // the vendor side, which the adjustment records as an external withdrawal.
        let current = self
            .db
            .fetch_wallet(user.id, DEFAULT_MERCHANT_ID)
            .await?
            .map(|w| w.balance)
            .unwrap_or_default();
        let adjustment = profile.balance - current;
        if !adjustment.is_zero() {
            self.db
                .adjust_balance(
                    user.id,
                    DEFAULT_MERCHANT_ID,
                    adjustment,
                    TxKind::MigrationAdjustment,
                    &format!("Migration balance alignment for {phone}"),
                )
                .await?;
        } else {
            // Still mark the migration as done so a repeat onboard is a no-op.
            self.db
                .adjust_balance(
                    user.id,
                    DEFAULT_MERCHANT_ID,
                    Money::default(),
                    TxKind::MigrationAdjustment,
                    &format!("Migration completed for {phone} with no balance change"),
                )
                .await?;
        }
        info!(
            "🧳️ Migrated user #{}: {imported} imported, {skipped} duplicates, adjustment {adjustment}",
            user.id
        );
        Ok(MigrationReport { user_id: user.id, imported, skipped, errors, adjustment, final_balance: profile.balance })
    }
}
