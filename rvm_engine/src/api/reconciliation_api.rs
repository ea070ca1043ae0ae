use log::*;
use rvm_common::Grams;

use crate::{
    db_types::{CleaningRecord, DisposalEvent, EventSource, Machine, User, WasteType},
    traits::{LedgerError, ProfileUpdate, ReconciliationDatabase, SubmissionOutcome},
};

/// The ingestion API. Every deposit event, whatever its origin, flows through [`process_event`] and nothing else, so
/// dedup and valuation behave identically for webhooks, history fetches and migration imports.
///
/// [`process_event`]: ReconciliationApi::process_event
#[derive(Debug, Clone)]
pub struct ReconciliationApi<B> {
    db: B,
}

impl<B: ReconciliationDatabase> ReconciliationApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub async fn process_event(
        &self,
        event: DisposalEvent,
        source: EventSource,
    ) -> Result<SubmissionOutcome, LedgerError> {
        self.db.process_event(event, source).await
    }

    pub async fn fetch_or_create_user(
        &self,
        vendor_user_no: Option<&str>,
        phone: Option<&str>,
    ) -> Result<User, LedgerError> {
        self.db.fetch_or_create_user(vendor_user_no, phone).await
    }

    pub async fn sync_user_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<User, LedgerError> {
        self.db.sync_user_profile(user_id, update).await
    }

    /// Best-effort raw capture of a webhook payload. Failures are logged and swallowed; raw logging never gates
    /// event processing.
    pub async fn raw_log(
        &self,
        device_no: Option<&str>,
        event_type: &str,
        vendor_user_no: Option<&str>,
        payload: &str,
    ) {
        if let Err(e) = self.db.raw_log(device_no, event_type, vendor_user_no, payload).await {
            warn!("📝️ Could not write machine log entry: {e}");
        }
    }

    pub async fn fetch_machine(&self, device_no: &str) -> Result<Option<Machine>, LedgerError> {
        self.db.fetch_machine(device_no).await
    }

    pub async fn active_machines(&self) -> Result<Vec<Machine>, LedgerError> {
        self.db.active_machines().await
    }

    pub async fn observe_bin_weight(
        &self,
        device_no: &str,
        position: i64,
        waste_type: WasteType,
        observed: Grams,
        threshold: Grams,
        min_delta: Grams,
    ) -> Result<Option<CleaningRecord>, LedgerError> {
        self.db.observe_bin_weight(device_no, position, waste_type, observed, threshold, min_delta).await
    }
}
