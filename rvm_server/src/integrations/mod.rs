pub mod vendor;

pub use vendor::{disposal_event_from_webhook, proxy_allowed, VendorSource};
