//! Request and response shapes for the HTTP surface.

use std::collections::HashMap;

use rvm_engine::db_types::{ReviewStatus, TxKind, WithdrawalStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    /// Confirmed weight in kg. Defaults to the machine-reported weight.
    pub final_weight_kg: Option<f64>,
    /// Per-kg rate override. Defaults to the rate stored on the row.
    pub rate: Option<f64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustRequest {
    pub user_id: i64,
    /// Defaults to the caller's merchant scope.
    pub merchant_id: Option<i64>,
    /// Signed amount in currency units.
    pub amount: f64,
    pub kind: TxKind,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalStatusRequest {
    pub status: WithdrawalStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleaningReviewRequest {
    pub status: ReviewStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnboardRequest {
    pub phone: String,
    pub nickname: Option<String>,
}

/// A signed passthrough request. Only allow-listed vendor endpoints may be reached this way.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyRequest {
    pub endpoint: String,
    /// HTTP method, defaulting to GET.
    pub method: Option<String>,
    #[serde(default)]
    pub params: HashMap<String, String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarvestParams {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CronParams {
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewListParams {
    pub user_id: Option<i64>,
    pub status: Option<ReviewStatus>,
    pub device_no: Option<String>,
    pub limit: Option<i64>,
}

/// Result of one cron poll sweep over the machine fleet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollReport {
    pub machines_checked: usize,
    pub cleaning_events: usize,
    pub errors: Vec<String>,
}
