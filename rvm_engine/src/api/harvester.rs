use chrono::Duration;
use futures_util::future::join_all;
use log::*;

use crate::{
    db_types::{EventSource, User},
    traits::{DisposalSource, HarvestReport, ReconciliationDatabase},
};

/// Users fetched per run.
pub const BATCH_SIZE: i64 = 10;
/// Disposal records fetched per user.
pub const FETCH_LIMIT: usize = 50;
/// Users synced more recently than this are skipped unless the run is forced.
pub fn sync_cooldown() -> Duration {
    Duration::minutes(2)
}

/// Pulls disposal history from the vendor for users that are due a sync, and feeds every record through
/// reconciliation.
///
/// Each user is claimed up front by advancing their sync timestamp through a conditional update, so concurrent runs
/// (or an overlapping cron schedule) never double-fetch the same user. Per-user vendor failures land in the report
/// and never abort the run.
#[derive(Debug, Clone)]
pub struct Harvester<B, S> {
    db: B,
    source: S,
}

impl<B, S> Harvester<B, S>
where
    B: ReconciliationDatabase,
    S: DisposalSource,
{
    pub fn new(db: B, source: S) -> Self {
        Self { db, source }
    }

    pub async fn run(&self, force: bool) -> Result<HarvestReport, crate::traits::LedgerError> {
        let candidates = self.db.harvest_candidates(BATCH_SIZE, sync_cooldown(), force).await?;
        if candidates.is_empty() {
            debug!("🌾️ No users due for a history sync");
            return Ok(HarvestReport::default());
        }
        info!("🌾️ Harvesting disposal history for {} user(s)", candidates.len());
        let results = join_all(candidates.into_iter().map(|user| self.sync_user(user, force))).await;
        let mut report = HarvestReport::default();
        for result in results {
            report.imported += result.imported;
            report.skipped += result.skipped;
            report.errors.extend(result.errors);
        }
        info!("🌾️ Harvest complete. Imported {}, skipped {}, {} error(s)", report.imported, report.skipped, report.errors.len());
        Ok(report)
    }

    async fn sync_user(&self, user: User, force: bool) -> HarvestReport {
        let mut report = HarvestReport::default();
        let Some(phone) = user.phone.clone() else {
            report.skipped += 1;
            return report;
        };
        match self.db.claim_user_for_sync(user.id, sync_cooldown(), force).await {
            Ok(true) => {},
            Ok(false) => {
                trace!("🌾️ User #{} was claimed by a concurrent run. Skipping.", user.id);
                report.skipped += 1;
                return report;
            },
            Err(e) => {
                report.errors.push(format!("user {}: {e}", user.id));
                return report;
            },
        }
        let events = match self.source.disposal_history(&phone, FETCH_LIMIT).await {
            Ok(events) => events,
            Err(e) => {
                warn!("🌾️ Could not fetch history for user #{}: {e}", user.id);
                report.errors.push(format!("user {}: {e}", user.id));
                return report;
            },
        };
        for event in events {
            let record_id = event.record_id.clone().unwrap_or_else(|| "<synthetic>".to_string());
            match self.db.process_event(event, EventSource::Fetch).await {
                Ok(outcome) if outcome.is_new() => report.imported += 1,
                Ok(_) => report.skipped += 1,
                Err(e) => report.errors.push(format!("user {} record {record_id}: {e}", user.id)),
            }
        }
        report
    }
}
