//! RVM Rewards Engine
//!
//! The engine turns raw deposit events from a fleet of reverse-vending machines into verified, valued ledger entries
//! and merchant wallet balances. It is storage-agnostic at the trait level; SQLite is the only backend currently
//! implemented.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`] and the contracts in [`mod@traits`]). You should never need to
//!    access the database directly. The exception is the data types used in the database, which are defined in
//!    [`mod@db_types`] and are public.
//! 2. The engine public API ([`mod@api`]). This provides the reconciliation flow, the settlement flow, the account
//!    harvester and the migration importer. Specific backends need to implement the traits in [`mod@traits`] in order
//!    to drive these APIs.
pub mod db_types;
pub mod helpers;
pub mod test_utils;
pub mod traits;

mod api;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use api::{Harvester, MigrationApi, ReconciliationApi, SettlementApi};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    DisposalSource,
    LedgerError,
    ProfileSource,
    ReconciliationDatabase,
    SettlementError,
    SettlementManagement,
    SourceError,
};
