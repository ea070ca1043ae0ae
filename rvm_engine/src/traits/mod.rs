//! Interface contracts for engine database backends and external data sources.
//!
//! * [`ReconciliationDatabase`] defines the ingestion side: identity resolution, dedup, valuation, raw logging and
//!   cleaning detection.
//! * [`SettlementManagement`] defines the review and wallet side: verification, rejection, manual adjustments,
//!   withdrawal bookkeeping and audit queries.
//! * [`DisposalSource`] and [`ProfileSource`] abstract the vendor gateway, so the harvester and migration importer can
//!   be driven by any implementation (including test stubs).
mod data_objects;
mod reconciliation;
mod settlement;
mod sources;

pub use data_objects::{HarvestReport, MigrationReport, ProfileUpdate, ReviewFilter, SubmissionOutcome, WalletAudit};
pub use reconciliation::{LedgerError, ReconciliationDatabase};
pub use settlement::{SettlementError, SettlementManagement};
pub use sources::{DisposalSource, ProfileSource, SourceError, VendorProfile};
