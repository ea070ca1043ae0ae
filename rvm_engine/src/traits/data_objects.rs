use rvm_common::{Grams, Money};
use serde::{Deserialize, Serialize};

use crate::db_types::{MerchantWallet, ReviewStatus, SubmissionReview};

/// The result of feeding one deposit event through reconciliation.
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// A brand-new row was written (and settled immediately when auto-verified).
    Inserted(SubmissionReview),
    /// An existing PENDING row was refreshed and promoted to VERIFIED.
    Promoted(SubmissionReview),
    /// The record was seen before and is already VERIFIED or REJECTED. Nothing was changed.
    AlreadyProcessed(SubmissionReview),
}

impl SubmissionOutcome {
    pub fn review(&self) -> &SubmissionReview {
        match self {
            SubmissionOutcome::Inserted(r) | SubmissionOutcome::Promoted(r) | SubmissionOutcome::AlreadyProcessed(r) => {
                r
            },
        }
    }

    /// True when this event resulted in a write (insert or promotion).
    pub fn is_new(&self) -> bool {
        !matches!(self, SubmissionOutcome::AlreadyProcessed(_))
    }
}

/// Profile fields to merge into a user row. Only present, non-empty values overwrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
    pub card_no: Option<String>,
    pub vendor_user_no: Option<String>,
    pub vendor_internal_id: Option<String>,
    pub lifetime_points: Option<Money>,
    pub total_weight: Option<Grams>,
}

/// Query filter for submission review listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewFilter {
    pub merchant_id: Option<i64>,
    pub user_id: Option<i64>,
    pub status: Option<ReviewStatus>,
    pub device_no: Option<String>,
    pub limit: Option<i64>,
}

impl ReviewFilter {
    pub fn with_merchant_id(mut self, merchant_id: i64) -> Self {
        self.merchant_id = Some(merchant_id);
        self
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: ReviewStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The conservation check for one wallet: the stored balance against the balance recomputed from first principles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletAudit {
    pub wallet: MerchantWallet,
    /// Sum of the values of all VERIFIED submissions for this (user, merchant).
    pub earned: Money,
    /// Sum of all non-REJECTED withdrawals for this (user, merchant).
    pub withdrawn: Money,
    /// Net of manual and migration adjustments in the transaction log.
    pub adjustments: Money,
    pub expected_balance: Money,
    pub consistent: bool,
}

/// Outcome of one harvester run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestReport {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Outcome of a migration import for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub user_id: i64,
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    /// The adjustment applied to land the wallet on the vendor's live balance.
    pub adjustment: Money,
    pub final_balance: Money,
}
