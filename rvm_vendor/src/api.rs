use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::*;
use md5::{Digest, Md5};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

use crate::{
    config::VendorConfig,
    data_objects::{AccountProfile, BinStatus, DisposalPage, NearbyMachine, VendorEnvelope},
    error::VendorApiError,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Signed client for the vendor cloud.
///
/// Every call carries `merchant-no`, `timestamp` and `sign` headers, where the signature is
/// `md5(merchant_no + secret + timestamp_ms)` in lowercase hex. The client is cheap to clone.
#[derive(Clone)]
pub struct VendorApi {
    config: VendorConfig,
    client: Arc<Client>,
}

impl VendorApi {
    pub fn new(config: VendorConfig) -> Result<Self, VendorApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VendorApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn merchant_no(&self) -> &str {
        &self.config.merchant_no
    }

    /// Computes the vendor signature for the given millisecond timestamp.
    pub fn sign(&self, timestamp_ms: i64) -> String {
        let mut hasher = Md5::new();
        hasher.update(self.config.merchant_no.as_bytes());
        hasher.update(self.config.secret.reveal().as_bytes());
        hasher.update(timestamp_ms.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn signed_headers(&self) -> Result<HeaderMap, VendorApiError> {
        let timestamp_ms = Utc::now().timestamp_millis();
        let mut headers = HeaderMap::with_capacity(3);
        let merchant = HeaderValue::from_str(&self.config.merchant_no)
            .map_err(|e| VendorApiError::Initialization(e.to_string()))?;
        headers.insert("merchant-no", merchant);
        headers.insert("timestamp", HeaderValue::from(timestamp_ms));
        let sign = HeaderValue::from_str(&self.sign(timestamp_ms))
            .map_err(|e| VendorApiError::Initialization(e.to_string()))?;
        headers.insert("sign", sign);
        Ok(headers)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base)
    }

    /// Issues a signed request and unwraps the vendor envelope, returning the `data` payload.
    ///
    /// The envelope's in-band `code` is authoritative. A `200 OK` transport status with `code != 200` is a failure.
    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, VendorApiError> {
        let url = self.url(path);
        trace!("Sending vendor query: {url}");
        let mut req = self.client.request(method, url).headers(self.signed_headers()?);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                VendorApiError::Timeout
            } else {
                VendorApiError::Transport(e.to_string())
            }
        })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| VendorApiError::Transport(e.to_string()))?;
            return Err(VendorApiError::QueryError { status, message });
        }
        let envelope =
            response.json::<VendorEnvelope<T>>().await.map_err(|e| VendorApiError::JsonError(e.to_string()))?;
        if envelope.code != 200 {
            return Err(VendorApiError::VendorCode {
                code: envelope.code,
                message: envelope.msg.unwrap_or_default(),
            });
        }
        envelope.data.ok_or(VendorApiError::EmptyResponse)
    }

    /// Registers (or refreshes) a user account on the vendor side and returns the vendor's view of it.
    ///
    /// The body field really is spelled `nikeName`; that is the vendor's wire format, not a typo here.
    pub async fn sync_user_account(&self, phone: &str, nick_name: &str) -> Result<AccountProfile, VendorApiError> {
        debug!("Syncing vendor account for {phone}");
        let body = json!({ "phone": phone, "nikeName": nick_name });
        let profile = self
            .rest_query::<AccountProfile, Value>(Method::POST, "/api/open/v1/user/account/sync", &[], Some(body))
            .await?;
        info!("Synced vendor account for {phone} as user {}", profile.user_no.as_deref().unwrap_or("<none>"));
        Ok(profile)
    }

    /// Fetches one page of a user's disposal history. Pages are 1-indexed.
    pub async fn disposal_history(
        &self,
        phone: &str,
        page_num: u32,
        page_size: u32,
    ) -> Result<DisposalPage, VendorApiError> {
        let page_num = page_num.to_string();
        let page_size = page_size.to_string();
        let params = [("phone", phone), ("pageNum", page_num.as_str()), ("pageSize", page_size.as_str())];
        debug!("Fetching disposal history page {page_num} for {phone}");
        let page = self.rest_query::<DisposalPage, ()>(Method::GET, "/api/open/v1/put", &params, None).await?;
        debug!("Fetched {} of {} disposal records for {phone}", page.records.len(), page.total);
        Ok(page)
    }

    /// Fetches the current fill levels of every compartment of the given machine.
    pub async fn device_positions(&self, device_no: &str) -> Result<Vec<BinStatus>, VendorApiError> {
        let params = [("deviceNo", device_no)];
        self.rest_query::<Vec<BinStatus>, ()>(Method::GET, "/api/open/v1/device/position", &params, None).await
    }

    /// Lists machines near the given coordinates.
    pub async fn nearby_machines(&self, longitude: f64, latitude: f64) -> Result<Vec<NearbyMachine>, VendorApiError> {
        let lng = longitude.to_string();
        let lat = latitude.to_string();
        let params = [("longitude", lng.as_str()), ("latitude", lat.as_str())];
        self.rest_query::<Vec<NearbyMachine>, ()>(Method::GET, "/api/open/video/v2/nearby", &params, None).await
    }

    /// Forwards an arbitrary call to the vendor and returns the raw envelope payload as JSON.
    ///
    /// Callers are responsible for restricting which paths may be reached this way.
    pub async fn raw_call(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Value, VendorApiError> {
        self.rest_query::<Value, Value>(method, path, params, body).await
    }
}
