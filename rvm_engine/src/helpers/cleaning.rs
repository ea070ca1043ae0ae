//! Bin-emptying detection.
//!
//! A cleaning is inferred, never reported: when a bin's fill weight drops from "meaningfully full" to "essentially
//! empty" between two observations, whoever emptied it collected the previous contents. The decision function here is
//! pure; dedup against recent records and snapshot persistence live in the database layer.
use chrono::Duration;
use rvm_common::Grams;

/// A bin reading below this is considered empty.
pub const LOW_WATER_MARK_KG: f64 = 1.0;
/// Default minimum fill weight before a drop counts as a cleaning.
pub const DEFAULT_THRESHOLD_KG: f64 = 0.5;
/// Minimum drop for the cron poller, which reads noisier live telemetry than the webhook path.
pub const POLL_DROP_THRESHOLD_KG: f64 = 2.0;
/// Snapshot changes smaller than this are sensor noise and are not persisted by the poller.
pub const MIN_SNAPSHOT_DELTA_KG: f64 = 0.05;

/// Two cleanings of the same device within this window are assumed to be one physical event.
pub fn cleaning_cooldown() -> Duration {
    Duration::minutes(45)
}

/// Decides whether the transition `last_known -> observed` was a bin emptying.
///
/// Returns the collected amount (the previous fill weight) when all three conditions hold: the bin held more than
/// `threshold`, the new reading is below the low-water mark, and the weight actually went down.
pub fn detect_drop(last_known: Grams, observed: Grams, threshold: Grams) -> Option<Grams> {
    let low_water = Grams::from_kg(LOW_WATER_MARK_KG);
    if last_known > threshold && observed < low_water && observed < last_known {
        Some(last_known)
    } else {
        None
    }
}
