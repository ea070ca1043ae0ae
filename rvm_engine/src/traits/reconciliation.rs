use chrono::Duration;
use rvm_common::Grams;
use thiserror::Error;

use crate::{
    db_types::{CleaningRecord, DisposalEvent, EventSource, Machine, User, WasteType},
    traits::{data_objects::SubmissionOutcome, ProfileUpdate},
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Cannot resolve a user without a vendor user number or a phone number")]
    IdentityUnresolvable,
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("The deposit event is unusable: {0}")]
    InvalidEvent(String),
    #[error("Vendor gateway error: {0}")]
    Gateway(String),
    #[error("Settlement error: {0}")]
    Settlement(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

impl From<crate::traits::SourceError> for LedgerError {
    fn from(e: crate::traits::SourceError) -> Self {
        LedgerError::Gateway(e.to_string())
    }
}

impl From<crate::traits::SettlementError> for LedgerError {
    fn from(e: crate::traits::SettlementError) -> Self {
        LedgerError::Settlement(e.to_string())
    }
}

/// The ingestion contract for engine backends.
///
/// Implementations must guarantee at-most-once credit per vendor record id: concurrent deliveries of the same record
/// may race, but exactly one caller observes an insert and every other caller observes the already-stored row.
#[allow(async_fn_in_trait)]
pub trait ReconciliationDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Runs one deposit event through the full reconciliation state machine in a single transaction:
    /// id normalization, dedup lookup, classification, rate resolution, identity resolution, insert-or-promote,
    /// and immediate wallet settlement when the row lands VERIFIED.
    async fn process_event(&self, event: DisposalEvent, source: EventSource) -> Result<SubmissionOutcome, LedgerError>;

    /// Finds a user by vendor number first, then phone, backfilling missing identifiers on the matched row.
    /// Inserts a ghost user when no row matches. Errors when both identifiers are absent.
    async fn fetch_or_create_user(
        &self,
        vendor_user_no: Option<&str>,
        phone: Option<&str>,
    ) -> Result<User, LedgerError>;

    /// Merges vendor profile data into the user row. Only non-empty values overwrite.
    async fn sync_user_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<User, LedgerError>;

    /// Appends the raw webhook payload to the machine log. Never gates processing.
    async fn raw_log(
        &self,
        device_no: Option<&str>,
        event_type: &str,
        vendor_user_no: Option<&str>,
        payload: &str,
    ) -> Result<(), LedgerError>;

    async fn fetch_machine(&self, device_no: &str) -> Result<Option<Machine>, LedgerError>;

    async fn active_machines(&self) -> Result<Vec<Machine>, LedgerError>;

    /// Records a new bin weight observation for one compartment of a machine.
    ///
    /// Runs cleaning detection against the stored snapshot, dedups against recent cleaning records, and advances the
    /// snapshot (when the change exceeds `min_delta`). Returns the cleaning record when one was created.
    async fn observe_bin_weight(
        &self,
        device_no: &str,
        position: i64,
        waste_type: WasteType,
        observed: Grams,
        threshold: Grams,
        min_delta: Grams,
    ) -> Result<Option<CleaningRecord>, LedgerError>;

    /// Active users with a phone number that are due for a history sync, oldest-synced first.
    async fn harvest_candidates(&self, batch_size: i64, cooldown: Duration, force: bool)
        -> Result<Vec<User>, LedgerError>;

    /// Claims a user for syncing by advancing `last_synced_at`, but only when it is still outside the cooldown
    /// (or `force` is set). Returns false when a concurrent run won the claim.
    async fn claim_user_for_sync(&self, user_id: i64, cooldown: Duration, force: bool) -> Result<bool, LedgerError>;
}
