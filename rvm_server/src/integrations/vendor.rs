//! Adapts the vendor gateway to the engine's source traits and normalizes vendor payloads into
//! [`DisposalEvent`]s. All vendor-shape knowledge on the server side lives here; the handlers in
//! [`crate::routes`] only ever see engine types.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::*;
use rvm_common::{Grams, Money};
use rvm_engine::{
    db_types::DisposalEvent,
    traits::{DisposalSource, ProfileSource, SourceError, VendorProfile},
};
use rvm_vendor::{DisposalRecord, VendorApi, VendorApiError, WebhookEvent};

/// Vendor endpoints reachable through the proxy passthrough. Anything else is rejected.
pub const PROXY_ALLOWLIST: [&str; 4] = [
    "/api/open/v1/user/account/sync",
    "/api/open/v1/put",
    "/api/open/v1/device/position",
    "/api/open/video/v2/nearby",
];

pub fn proxy_allowed(endpoint: &str) -> bool {
    PROXY_ALLOWLIST.contains(&endpoint)
}

/// The vendor timestamps are naive local-time strings. They are recorded as UTC; ordering is all the engine
/// needs from them.
fn parse_vendor_time(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
        .map(|t| t.and_utc())
        .unwrap_or_else(Utc::now)
}

/// Normalizes a push event into the engine's input shape. Junk record ids pass through verbatim; filtering and
/// fallback-id synthesis belong to reconciliation.
pub fn disposal_event_from_webhook(event: &WebhookEvent) -> DisposalEvent {
    let mut result =
        DisposalEvent::new(Grams::from_kg(event.total_weight), Money::from_value(event.integral), Utc::now());
    result.record_id = event.put_id.clone();
    result.vendor_user_no = event.user_id.clone();
    result.phone = event.phone.clone();
    result.device_no = event.device_no.clone();
    result.raw_label = event.items.iter().find_map(|i| i.rubbish_name.clone());
    result.photo_url = event.img_url.clone();
    // The primary item's compartment fill level is the review's bin snapshot; oil machines report it only at the
    // top level of the payload.
    result.bin_snapshot = event
        .items
        .first()
        .map(|i| i.position_weight)
        .filter(|w| *w > 0.0)
        .or(event.position_weight)
        .map(Grams::from_kg);
    result
}

fn disposal_event_from_record(record: &DisposalRecord) -> DisposalEvent {
    let submitted_at = parse_vendor_time(record.create_time.as_deref());
    let mut result =
        DisposalEvent::new(Grams::from_kg(record.weight), Money::from_value(record.integral), submitted_at);
    result.record_id = record.id.clone();
    result.device_no = record.device_no.clone();
    result.raw_label = record.details.iter().find_map(|d| d.rubbish_name.clone());
    result.photo_url = record.img_url.clone();
    result
}

/// The production implementation of the engine's source traits, backed by the signed vendor client.
#[derive(Clone)]
pub struct VendorSource {
    api: VendorApi,
}

impl VendorSource {
    pub fn new(api: VendorApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &VendorApi {
        &self.api
    }
}

impl DisposalSource for VendorSource {
    async fn disposal_history(&self, phone: &str, limit: usize) -> Result<Vec<DisposalEvent>, SourceError> {
        let page = self
            .api
            .disposal_history(phone, 1, limit as u32)
            .await
            .map_err(|e| SourceError::Vendor(e.to_string()))?;
        trace!("🛢️ Vendor returned {} of {} history records for {phone}", page.records.len(), page.total);
        Ok(page.records.iter().map(disposal_event_from_record).collect())
    }
}

impl ProfileSource for VendorSource {
    async fn account_profile(&self, phone: &str, nickname: &str) -> Result<VendorProfile, SourceError> {
        let profile = self.api.sync_user_account(phone, nickname).await.map_err(|e| match e {
            VendorApiError::EmptyResponse => SourceError::NoSuchAccount(phone.to_string()),
            other => SourceError::Vendor(other.to_string()),
        })?;
        Ok(VendorProfile {
            vendor_user_no: profile.user_no,
            nickname: profile.nick_name,
            balance: Money::from_value(profile.integral),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn webhook_events_normalize_into_disposal_events() {
        let json = r#"{
            "type": "PUT",
            "userId": "900123",
            "deviceNo": "GCM-0042",
            "putId": "REC-1",
            "totalWeight": "2.5",
            "integral": "0.75",
            "phone": "0123456789",
            "positionWeight": 3.2,
            "userRubbishPutDetailsVOList": [
                {"positionId": 1, "rubbishName": "Botol Plastik", "positionWeight": 2.5}
            ]
        }"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        let disposal = disposal_event_from_webhook(&event);
        assert_eq!(disposal.record_id.as_deref(), Some("REC-1"));
        assert_eq!(disposal.weight, Grams::from_kg(2.5));
        assert_eq!(disposal.points, Money::from_value(0.75));
        assert_eq!(disposal.raw_label.as_deref(), Some("Botol Plastik"));
        // The primary item's fill level wins over the top-level one.
        assert_eq!(disposal.bin_snapshot, Some(Grams::from_kg(2.5)));
    }

    #[test]
    fn oil_machine_events_fall_back_to_the_top_level_fill_weight() {
        let json = r#"{"type": "PUT", "deviceNo": "GCM-0050", "putId": "REC-9", "totalWeight": 1.0, "positionWeight": 3.2}"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        let disposal = disposal_event_from_webhook(&event);
        assert_eq!(disposal.bin_snapshot, Some(Grams::from_kg(3.2)));

        let json = r#"{"type": "PUT", "deviceNo": "GCM-0050", "putId": "REC-10", "totalWeight": 1.0}"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(disposal_event_from_webhook(&event).bin_snapshot, None);
    }

    #[test]
    fn history_records_keep_their_vendor_timestamps() {
        let json = r#"{
            "id": "REC-2",
            "deviceNo": "GCM-0042",
            "weight": 1.0,
            "integral": 0.30,
            "createTime": "2024-03-05 14:30:00",
            "rubbishLogDetailsVOList": [{"rubbishName": "Kertas", "weight": 1.0, "integral": 0.30}]
        }"#;
        let record: DisposalRecord = serde_json::from_str(json).unwrap();
        let disposal = disposal_event_from_record(&record);
        assert_eq!(disposal.submitted_at.to_rfc3339(), "2024-03-05T14:30:00+00:00");
        assert_eq!(disposal.raw_label.as_deref(), Some("Kertas"));
    }

    #[test]
    fn the_proxy_allowlist_is_exact_match_only() {
        assert!(proxy_allowed("/api/open/v1/put"));
        assert!(!proxy_allowed("/api/open/v1/put/"));
        assert!(!proxy_allowed("/api/admin/merchant/delete"));
        assert!(!proxy_allowed(""));
    }
}
