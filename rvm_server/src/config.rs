use std::env;

use log::*;
use rvm_common::Secret;
use rvm_engine::helpers::cleaning::DEFAULT_THRESHOLD_KG;
use rvm_vendor::VendorConfig;

const DEFAULT_RVM_HOST: &str = "127.0.0.1";
const DEFAULT_RVM_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/rvm_store.db";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Shared secret for the cron poll endpoint. An empty secret disables the endpoint entirely.
    pub cron_secret: Secret<String>,
    /// Minimum bin fill weight, in kg, before a drop on the webhook path counts as a cleaning.
    pub cleaning_threshold_kg: f64,
    pub vendor: VendorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RVM_HOST.to_string(),
            port: DEFAULT_RVM_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            cron_secret: Secret::default(),
            cleaning_threshold_kg: DEFAULT_THRESHOLD_KG,
            vendor: VendorConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("RVM_HOST").ok().unwrap_or_else(|| DEFAULT_RVM_HOST.into());
        let port = env::var("RVM_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("{s} is not a valid port for RVM_PORT. {e} Using the default, {DEFAULT_RVM_PORT}, instead.");
                    DEFAULT_RVM_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_RVM_PORT);
        let database_url = env::var("RVM_DATABASE_URL").unwrap_or_else(|_| {
            warn!("RVM_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.into()
        });
        let cron_secret = Secret::new(env::var("RVM_CRON_SECRET").unwrap_or_else(|_| {
            warn!("RVM_CRON_SECRET is not set. The cron poll endpoint will reject every call.");
            String::default()
        }));
        let cleaning_threshold_kg = env::var("RVM_CLEANING_THRESHOLD_KG")
            .ok()
            .and_then(|s| {
                s.parse::<f64>()
                    .map_err(|e| {
                        error!("{s} is not a valid value for RVM_CLEANING_THRESHOLD_KG. {e} Using the default.");
                        e
                    })
                    .ok()
            })
            .unwrap_or(DEFAULT_THRESHOLD_KG);
        Self {
            host,
            port,
            database_url,
            cron_secret,
            cleaning_threshold_kg,
            vendor: VendorConfig::new_from_env_or_default(),
        }
    }
}
