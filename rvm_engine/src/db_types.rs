//! Data types that are used in the database and across the engine's public API.
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use rvm_common::{Grams, Money};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The platform owner's merchant id, seeded by the migrations. Events from machines that are not assigned to any
/// merchant are booked here.
pub const DEFAULT_MERCHANT_ID: i64 = 1;

/// The vendor's identifier for a single deposit. Globally unique; synthesized ids carry a `SYN-` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct RecordId(pub String);

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Review state shared by submissions and cleaning records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    Verified,
    Rejected,
}

impl Display for ReviewStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewStatus::Pending => write!(f, "PENDING"),
            ReviewStatus::Verified => write!(f, "VERIFIED"),
            ReviewStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// How a deposit event entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventSource {
    Webhook,
    Fetch,
    Migration,
    Manual,
}

impl Display for EventSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSource::Webhook => write!(f, "WEBHOOK"),
            EventSource::Fetch => write!(f, "FETCH"),
            EventSource::Migration => write!(f, "MIGRATION"),
            EventSource::Manual => write!(f, "MANUAL"),
        }
    }
}

/// Ledger entry kinds for the append-only wallet transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxKind {
    RecycleEarning,
    ManualAdjustment,
    WithdrawalSync,
    MigrationAdjustment,
}

impl Display for TxKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TxKind::RecycleEarning => write!(f, "RECYCLE_EARNING"),
            TxKind::ManualAdjustment => write!(f, "MANUAL_ADJUSTMENT"),
            TxKind::WithdrawalSync => write!(f, "WITHDRAWAL_SYNC"),
            TxKind::MigrationAdjustment => write!(f, "MIGRATION_ADJUSTMENT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
    /// Records a payout that happened on the vendor's side, imported for bookkeeping only.
    ExternalSync,
}

impl Display for WithdrawalStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "PENDING"),
            WithdrawalStatus::Approved => write!(f, "APPROVED"),
            WithdrawalStatus::Rejected => write!(f, "REJECTED"),
            WithdrawalStatus::Paid => write!(f, "PAID"),
            WithdrawalStatus::ExternalSync => write!(f, "EXTERNAL_SYNC"),
        }
    }
}

/// The material categories the platform pays out on. Classification from the machines' free-text labels is in
/// [`crate::helpers::waste`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WasteType {
    Plastic,
    Paper,
    Uco,
    Can,
    Glass,
    Unknown,
}

impl Display for WasteType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WasteType::Plastic => write!(f, "PLASTIC"),
            WasteType::Paper => write!(f, "PAPER"),
            WasteType::Uco => write!(f, "UCO"),
            WasteType::Can => write!(f, "CAN"),
            WasteType::Glass => write!(f, "GLASS"),
            WasteType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A platform user. Users are matched to vendor identities lazily and are never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub vendor_user_no: Option<String>,
    pub phone: Option<String>,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub card_no: Option<String>,
    pub vendor_internal_id: Option<String>,
    pub lifetime_points: Money,
    pub total_weight: Grams,
    pub is_active: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Merchant {
    pub id: i64,
    pub name: String,
    pub currency_symbol: String,
    pub config_bin_1: Option<String>,
    pub config_bin_2: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A physical reverse-vending machine and its per-material payout rates.
///
/// Rates are per kilogram. A NULL rate means the machine has no configured payout for that material and the implied
/// rate fallback applies.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Machine {
    pub id: i64,
    pub device_no: String,
    pub merchant_id: i64,
    pub name: Option<String>,
    pub rate_plastic: Option<f64>,
    pub rate_paper: Option<f64>,
    pub rate_can: Option<f64>,
    pub rate_uco: Option<f64>,
    pub rate_glass: Option<f64>,
    pub bin_weight_1: Grams,
    pub bin_weight_2: Grams,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Machine {
    pub fn rate_for(&self, waste_type: WasteType) -> Option<f64> {
        match waste_type {
            WasteType::Plastic => self.rate_plastic,
            WasteType::Paper => self.rate_paper,
            WasteType::Can => self.rate_can,
            WasteType::Uco => self.rate_uco,
            WasteType::Glass => self.rate_glass,
            WasteType::Unknown => None,
        }
    }
}

/// One deposit awaiting (or past) review. The row is the unit of dedup: `vendor_record_id` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubmissionReview {
    pub id: i64,
    pub vendor_record_id: RecordId,
    pub user_id: i64,
    pub merchant_id: i64,
    pub device_no: Option<String>,
    pub waste_type: WasteType,
    pub api_weight: Grams,
    pub confirmed_weight: Grams,
    pub machine_points: Money,
    pub value: Money,
    pub rate_per_kg: f64,
    pub status: ReviewStatus,
    pub source: EventSource,
    pub photo_url: Option<String>,
    pub bin_weight_snapshot: Option<Grams>,
    pub reviewer_note: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MerchantWallet {
    pub id: i64,
    pub user_id: i64,
    pub merchant_id: i64,
    pub balance: Money,
    pub total_earnings: Money,
    pub total_weight: Grams,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WalletTransaction {
    pub id: i64,
    pub user_id: i64,
    pub merchant_id: i64,
    pub amount: Money,
    pub balance_after: Money,
    pub transaction_type: TxKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Withdrawal {
    pub id: i64,
    pub user_id: i64,
    pub merchant_id: i64,
    pub amount: Money,
    pub status: WithdrawalStatus,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub account_holder_name: Option<String>,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CleaningRecord {
    pub id: i64,
    pub device_no: String,
    pub merchant_id: i64,
    pub waste_type: WasteType,
    pub weight_collected: Grams,
    pub photo_url: Option<String>,
    pub cleaner_name: Option<String>,
    pub status: ReviewStatus,
    pub admin_note: Option<String>,
    pub cleaned_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A normalized deposit event, whatever its origin (webhook push, history fetch, migration import).
///
/// This is the engine's only input shape for reconciliation. The raw vendor payload never crosses this boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisposalEvent {
    /// The vendor's record id, verbatim. May be absent or junk; normalization happens during reconciliation.
    pub record_id: Option<String>,
    pub vendor_user_no: Option<String>,
    pub phone: Option<String>,
    pub device_no: Option<String>,
    pub weight: Grams,
    pub points: Money,
    /// The machine's free-text material label, e.g. "Botol Plastik".
    pub raw_label: Option<String>,
    pub photo_url: Option<String>,
    /// Bin fill weight reported alongside the event, used for cleaning detection.
    pub bin_snapshot: Option<Grams>,
    pub submitted_at: DateTime<Utc>,
}

impl DisposalEvent {
    pub fn new(weight: Grams, points: Money, submitted_at: DateTime<Utc>) -> Self {
        Self {
            record_id: None,
            vendor_user_no: None,
            phone: None,
            device_no: None,
            weight,
            points,
            raw_label: None,
            photo_url: None,
            bin_snapshot: None,
            submitted_at,
        }
    }
}
