//! Waste classification from the machines' free-text material labels.
//!
//! Labels arrive in a mix of English and Bahasa ("Botol Plastik", "Kertas", "Used Cooking Oil"). Classification is a
//! case-insensitive substring match with a fixed precedence, so the same label always lands in the same category.
use crate::db_types::WasteType;

impl WasteType {
    /// Classifies a raw material label.
    ///
    /// Precedence: Paper, then UCO, then Glass, then Can. Any other non-empty label defaults to Plastic, since
    /// plastic bottles are what the machines overwhelmingly take. `Unknown` is reserved for absent labels.
    pub fn detect(raw_label: Option<&str>) -> WasteType {
        let label = raw_label.map(str::trim).unwrap_or_default();
        if label.is_empty() {
            return WasteType::Unknown;
        }
        let label = label.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| label.contains(n));
        if has(&["paper", "kertas", "buku", "book"]) {
            WasteType::Paper
        } else if has(&["oil", "minyak", "uco"]) {
            WasteType::Uco
        } else if has(&["glass", "kaca"]) {
            WasteType::Glass
        } else if has(&["can", "tin", "aluminium"]) {
            WasteType::Can
        } else {
            WasteType::Plastic
        }
    }
}
