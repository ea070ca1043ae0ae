//! The engine's public API.
//!
//! Each API object wraps a backend implementing the relevant trait and carries the flow-level logic and logging.
//! Servers construct these once and share them across handlers.
mod harvester;
mod migration_api;
mod reconciliation_api;
mod settlement_api;

pub use harvester::Harvester;
pub use migration_api::MigrationApi;
pub use reconciliation_api::ReconciliationApi;
pub use settlement_api::SettlementApi;
