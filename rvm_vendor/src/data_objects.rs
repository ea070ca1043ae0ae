//! Typed views over the vendor's payloads.
//!
//! Field names mirror the vendor's camelCase JSON. Numeric fields use the lenient deserializers from [`crate::helpers`]
//! because the vendor mixes numbers and numeric strings freely across firmware versions.

use serde::{Deserialize, Serialize};

use crate::helpers::{lenient_bool, lenient_f64, lenient_i64, lenient_opt_f64, lenient_opt_string};

/// The generic response envelope wrapping every vendor API call.
///
/// A call has succeeded only when `code == 200`; the HTTP status alone is not sufficient.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorEnvelope<T> {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub code: i64,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub msg: Option<String>,
    pub data: Option<T>,
}

/// A single compartment line item inside a webhook deposit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookItem {
    #[serde(default, rename = "positionId", deserialize_with = "lenient_opt_string")]
    pub position_id: Option<String>,
    #[serde(default, rename = "rubbishName", deserialize_with = "lenient_opt_string")]
    pub rubbish_name: Option<String>,
    #[serde(default, rename = "positionWeight", deserialize_with = "lenient_f64")]
    pub position_weight: f64,
}

/// A push event as delivered to the webhook endpoint.
///
/// `event_type` is `PUT` for a deposit; older firmware sends the numeric code 1 instead. Other values
/// (heartbeats, door events) are logged and ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(default, rename = "type", deserialize_with = "lenient_opt_string")]
    pub event_type: Option<String>,
    #[serde(default, rename = "userId", deserialize_with = "lenient_opt_string")]
    pub user_id: Option<String>,
    #[serde(default, rename = "deviceNo", deserialize_with = "lenient_opt_string")]
    pub device_no: Option<String>,
    #[serde(default, rename = "putId", deserialize_with = "lenient_opt_string")]
    pub put_id: Option<String>,
    #[serde(default, rename = "totalWeight", deserialize_with = "lenient_f64")]
    pub total_weight: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub integral: f64,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub phone: Option<String>,
    #[serde(default, rename = "imgUrl", deserialize_with = "lenient_opt_string")]
    pub img_url: Option<String>,
    #[serde(default, rename = "userRubbishPutDetailsVOList")]
    pub items: Vec<WebhookItem>,
    /// Bin fill weight at the time of the event, when the firmware reports it.
    #[serde(default, rename = "positionWeight", deserialize_with = "lenient_opt_f64")]
    pub position_weight: Option<f64>,
}

/// A user account as the vendor knows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountProfile {
    #[serde(default, rename = "userNo", deserialize_with = "lenient_opt_string")]
    pub user_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub phone: Option<String>,
    #[serde(default, rename = "nikeName", deserialize_with = "lenient_opt_string")]
    pub nick_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub integral: f64,
}

/// A material breakdown line within a historical disposal record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisposalDetail {
    #[serde(default, rename = "rubbishName", deserialize_with = "lenient_opt_string")]
    pub rubbish_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub weight: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub integral: f64,
}

/// A historical disposal record from the vendor's paged history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisposalRecord {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub id: Option<String>,
    #[serde(default, rename = "deviceNo", deserialize_with = "lenient_opt_string")]
    pub device_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub weight: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub integral: f64,
    #[serde(default, rename = "createTime", deserialize_with = "lenient_opt_string")]
    pub create_time: Option<String>,
    #[serde(default, rename = "imgUrl", deserialize_with = "lenient_opt_string")]
    pub img_url: Option<String>,
    #[serde(default, rename = "rubbishLogDetailsVOList")]
    pub details: Vec<DisposalDetail>,
}

/// One page of disposal history.
#[derive(Debug, Clone, Deserialize)]
pub struct DisposalPage {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total: i64,
    #[serde(default, rename = "list")]
    pub records: Vec<DisposalRecord>,
}

/// Fill status of one compartment of a machine, from the device position endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinStatus {
    #[serde(default, rename = "deviceNo", deserialize_with = "lenient_opt_string")]
    pub device_no: Option<String>,
    #[serde(default, rename = "positionId", deserialize_with = "lenient_opt_string")]
    pub position_id: Option<String>,
    #[serde(default, rename = "rubbishName", deserialize_with = "lenient_opt_string")]
    pub rubbish_name: Option<String>,
    #[serde(default, rename = "positionWeight", deserialize_with = "lenient_f64")]
    pub weight: f64,
    #[serde(default, rename = "isFull", deserialize_with = "lenient_bool")]
    pub is_full: bool,
}

/// A machine and its location, from the nearby-machines endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyMachine {
    #[serde(default, rename = "deviceNo", deserialize_with = "lenient_opt_string")]
    pub device_no: Option<String>,
    #[serde(default, rename = "deviceName", deserialize_with = "lenient_opt_string")]
    pub device_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub latitude: Option<f64>,
    #[serde(default, rename = "onlineStatus", deserialize_with = "lenient_bool")]
    pub online: bool,
}
