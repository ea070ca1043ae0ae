use rvm_common::{Grams, Money};
use thiserror::Error;

use crate::{
    db_types::{CleaningRecord, MerchantWallet, ReviewStatus, SubmissionReview, TxKind, Withdrawal, WithdrawalStatus},
    traits::{ReviewFilter, WalletAudit},
};

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Submission review {0} does not exist")]
    ReviewNotFound(i64),
    #[error("Submission review {id} is {status}, not PENDING")]
    NotPending { id: i64, status: ReviewStatus },
    #[error("No wallet exists for user {user_id} and merchant {merchant_id}")]
    WalletNotFound { user_id: i64, merchant_id: i64 },
    #[error("Withdrawal {0} does not exist")]
    WithdrawalNotFound(i64),
    #[error("Cleaning record {0} does not exist")]
    CleaningNotFound(i64),
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}

/// The review and wallet contract for engine backends.
///
/// Every balance mutation is a single SQL arithmetic update inside a transaction, paired with an append-only
/// transaction log entry carrying the post-mutation balance.
#[allow(async_fn_in_trait)]
pub trait SettlementManagement: Clone {
    /// Verifies a PENDING submission: recomputes the value from the confirmed weight and rate, marks it VERIFIED,
    /// credits the wallet and bumps the user's lifetime totals, all in one transaction.
    ///
    /// `final_weight` and `rate_override` default to the stored api weight and rate. Fails with [`NotPending`] for
    /// rows that were already settled.
    async fn verify_submission(
        &self,
        review_id: i64,
        final_weight: Option<Grams>,
        rate_override: Option<f64>,
        note: Option<&str>,
    ) -> Result<SubmissionReview, SettlementError>;

    /// Rejects a PENDING submission: zeroes the confirmed weight and value, stores the reason. No wallet mutation.
    async fn reject_submission(&self, review_id: i64, reason: &str) -> Result<SubmissionReview, SettlementError>;

    /// Manual ledger mutation. Credits (or debits) the wallet and appends a transaction of the given kind.
    ///
    /// Negative `WITHDRAWAL_SYNC` and `MIGRATION_ADJUSTMENT` amounts additionally insert an EXTERNAL_SYNC withdrawal
    /// row for the absolute amount, keeping the conservation sum intact. Returns the new balance.
    async fn adjust_balance(
        &self,
        user_id: i64,
        merchant_id: i64,
        amount: Money,
        kind: TxKind,
        description: &str,
    ) -> Result<Money, SettlementError>;

    async fn fetch_wallet(&self, user_id: i64, merchant_id: i64) -> Result<Option<MerchantWallet>, SettlementError>;

    /// Moves a withdrawal to a new status. Entering REJECTED refunds the amount to the wallet; leaving REJECTED
    /// deducts it again.
    async fn update_withdrawal_status(
        &self,
        withdrawal_id: i64,
        status: WithdrawalStatus,
        note: Option<&str>,
    ) -> Result<Withdrawal, SettlementError>;

    async fn review_cleaning(
        &self,
        cleaning_id: i64,
        status: ReviewStatus,
        note: Option<&str>,
    ) -> Result<CleaningRecord, SettlementError>;

    async fn fetch_reviews(&self, filter: ReviewFilter) -> Result<Vec<SubmissionReview>, SettlementError>;

    /// Recomputes the conservation sum for one wallet:
    /// `balance == Σ VERIFIED submission values − Σ non-REJECTED withdrawals + Σ adjustments`.
    async fn wallet_audit(&self, user_id: i64, merchant_id: i64) -> Result<WalletAudit, SettlementError>;

    /// True when a MIGRATION_ADJUSTMENT transaction already exists for this (user, merchant).
    async fn has_migration_adjustment(&self, user_id: i64, merchant_id: i64) -> Result<bool, SettlementError>;
}
