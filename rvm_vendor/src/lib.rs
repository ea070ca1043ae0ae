//! Client for the vendor cloud API that operates the physical reverse-vending machines.
//!
//! The vendor is an untrusted, occasionally-wrong oracle: numbers arrive as strings, fields go missing, and the
//! response envelope signals failure both via HTTP status and via an in-band `code` field. Everything tolerant or
//! defensive about its payloads lives in this crate, so the engine only ever sees well-typed records.

mod api;
mod config;
pub mod data_objects;
mod error;
pub mod helpers;

pub use api::VendorApi;
pub use reqwest::Method;
pub use config::VendorConfig;
pub use data_objects::{
    AccountProfile,
    BinStatus,
    DisposalDetail,
    DisposalPage,
    DisposalRecord,
    NearbyMachine,
    WebhookEvent,
    WebhookItem,
};
pub use error::VendorApiError;
