use rvm_common::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::DisposalEvent;

#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("Vendor gateway error: {0}")]
    Vendor(String),
    #[error("The vendor has no account for {0}")]
    NoSuchAccount(String),
}

/// A user's account as the vendor sees it, already normalized into engine types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VendorProfile {
    pub vendor_user_no: Option<String>,
    pub nickname: Option<String>,
    /// The user's live point balance on the vendor side.
    pub balance: Money,
}

/// Supplies historical deposit events for a user. Implemented by the vendor gateway and by test stubs.
#[allow(async_fn_in_trait)]
pub trait DisposalSource {
    async fn disposal_history(&self, phone: &str, limit: usize) -> Result<Vec<DisposalEvent>, SourceError>;
}

/// Supplies (and registers) vendor account profiles.
#[allow(async_fn_in_trait)]
pub trait ProfileSource {
    async fn account_profile(&self, phone: &str, nickname: &str) -> Result<VendorProfile, SourceError>;
}
