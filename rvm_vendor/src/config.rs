use log::*;
use rvm_common::Secret;

const DEFAULT_API_BASE: &str = "https://api.autogcm.com";

#[derive(Debug, Clone, Default)]
pub struct VendorConfig {
    /// Base URL of the vendor cloud, e.g. "https://api.autogcm.com"
    pub api_base: String,
    /// The merchant number assigned by the vendor. Sent in the `merchant-no` header of every call.
    pub merchant_no: String,
    /// The shared signing secret for this merchant number.
    pub secret: Secret<String>,
}

impl VendorConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_base = std::env::var("RVM_VENDOR_API_BASE").unwrap_or_else(|_| {
            info!("RVM_VENDOR_API_BASE not set, using {DEFAULT_API_BASE}");
            DEFAULT_API_BASE.to_string()
        });
        let merchant_no = std::env::var("RVM_VENDOR_MERCHANT_NO").unwrap_or_else(|_| {
            warn!("RVM_VENDOR_MERCHANT_NO not set. Vendor calls will be rejected upstream.");
            String::default()
        });
        let secret = Secret::new(std::env::var("RVM_VENDOR_SECRET").unwrap_or_else(|_| {
            warn!("RVM_VENDOR_SECRET not set. Vendor calls will be rejected upstream.");
            String::default()
        }));
        Self { api_base, merchant_no, secret }
    }
}
