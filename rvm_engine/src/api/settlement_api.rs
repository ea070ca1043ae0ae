use rvm_common::{Grams, Money};

use crate::{
    db_types::{CleaningRecord, MerchantWallet, ReviewStatus, SubmissionReview, TxKind, Withdrawal, WithdrawalStatus},
    traits::{ReviewFilter, SettlementError, SettlementManagement, WalletAudit},
};

/// The review and wallet API used by admin endpoints.
#[derive(Debug, Clone)]
pub struct SettlementApi<B> {
    db: B,
}

impl<B: SettlementManagement> SettlementApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn verify(
        &self,
        review_id: i64,
        final_weight: Option<Grams>,
        rate_override: Option<f64>,
        note: Option<&str>,
    ) -> Result<SubmissionReview, SettlementError> {
        self.db.verify_submission(review_id, final_weight, rate_override, note).await
    }

    pub async fn reject(&self, review_id: i64, reason: &str) -> Result<SubmissionReview, SettlementError> {
        self.db.reject_submission(review_id, reason).await
    }

    pub async fn adjust_balance(
        &self,
        user_id: i64,
        merchant_id: i64,
        amount: Money,
        kind: TxKind,
        description: &str,
    ) -> Result<Money, SettlementError> {
        self.db.adjust_balance(user_id, merchant_id, amount, kind, description).await
    }

    pub async fn fetch_wallet(&self, user_id: i64, merchant_id: i64) -> Result<Option<MerchantWallet>, SettlementError> {
        self.db.fetch_wallet(user_id, merchant_id).await
    }

    pub async fn update_withdrawal_status(
        &self,
        withdrawal_id: i64,
        status: WithdrawalStatus,
        note: Option<&str>,
    ) -> Result<Withdrawal, SettlementError> {
        self.db.update_withdrawal_status(withdrawal_id, status, note).await
    }

    pub async fn review_cleaning(
        &self,
        cleaning_id: i64,
        status: ReviewStatus,
        note: Option<&str>,
    ) -> Result<CleaningRecord, SettlementError> {
        self.db.review_cleaning(cleaning_id, status, note).await
    }

    pub async fn fetch_reviews(&self, filter: ReviewFilter) -> Result<Vec<SubmissionReview>, SettlementError> {
        self.db.fetch_reviews(filter).await
    }

    pub async fn wallet_audit(&self, user_id: i64, merchant_id: i64) -> Result<WalletAudit, SettlementError> {
        self.db.wallet_audit(user_id, merchant_id).await
    }

    pub async fn has_migration_adjustment(&self, user_id: i64, merchant_id: i64) -> Result<bool, SettlementError> {
        self.db.has_migration_adjustment(user_id, merchant_id).await
    }
}
