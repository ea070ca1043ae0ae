//! Vendor record id normalization and fallback synthesis.
use chrono::{DateTime, Utc};
use rand::Rng;
use rvm_common::Grams;

use crate::db_types::RecordId;

/// Strips junk vendor ids. The vendor's upstream occasionally serializes absent ids as the literal strings
/// "undefined" or "null".
pub fn normalize_record_id(raw: Option<&str>) -> Option<RecordId> {
    let id = raw.map(str::trim).unwrap_or_default();
    if id.is_empty() || id.eq_ignore_ascii_case("undefined") || id.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(RecordId::from(id))
    }
}

/// Synthesizes a record id for an event the vendor did not identify.
///
/// The id is `SYN-{timestamp_ms}-{floor(kg*100)}-{rand}` with a 4-digit random suffix, so two legitimate distinct
/// events in the same millisecond with the same weight still get distinct ids.
pub fn fallback_record_id(submitted_at: DateTime<Utc>, weight: Grams) -> RecordId {
    let centikg = weight.value() / 10;
    let suffix = rand::thread_rng().gen_range(0..10_000u32);
    RecordId(format!("SYN-{}-{}-{:04}", submitted_at.timestamp_millis(), centikg, suffix))
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn junk_ids_are_filtered() {
        assert_eq!(normalize_record_id(None), None);
        assert_eq!(normalize_record_id(Some("")), None);
        assert_eq!(normalize_record_id(Some("  ")), None);
        assert_eq!(normalize_record_id(Some("undefined")), None);
        assert_eq!(normalize_record_id(Some("NULL")), None);
        assert_eq!(normalize_record_id(Some("REC-001")), Some(RecordId::from("REC-001")));
    }

    #[test]
    fn fallback_ids_carry_timestamp_and_weight() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let id = fallback_record_id(at, Grams::from_kg(2.5));
        assert!(id.0.starts_with("SYN-1700000000000-250-"));
    }

    #[test]
    fn fallback_ids_rarely_collide() {
        let at = Utc::now();
        let w = Grams::from_kg(1.0);
        let ids: HashSet<String> = (0..50).map(|_| fallback_record_id(at, w).0).collect();
        // 50 draws from 10k suffixes should essentially never fully collapse.
        assert!(ids.len() > 1);
    }
}
