//! The RVM rewards platform HTTP surface.
//!
//! The server owns no business logic. It wires the vendor webhook, the cron poller, the harvester and the admin
//! settlement endpoints to the engine APIs in `rvm_engine`, and the signed vendor client in `rvm_vendor`.
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod routes;
pub mod server;
