//! Pure helper functions used by the reconciliation and settlement flows.
//!
//! Everything in here is deterministic (save for the random suffix in [`ids::fallback_record_id`]) and free of I/O,
//! so the decision logic can be tested without a database.
pub mod cleaning;
pub mod ids;
pub mod rates;
pub mod waste;
