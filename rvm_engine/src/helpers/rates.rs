//! Payout rate resolution and valuation.
use rvm_common::{Grams, Money};

use crate::db_types::{Machine, WasteType};

/// Resolves the per-kg rate to apply to a deposit.
///
/// The machine's configured rate for the material wins. Without a machine (or without a configured rate for that
/// material), the rate the vendor implicitly applied (`points / weight`) is used, so migrated and unmatched history
/// still values consistently. The resolved rate is persisted with the submission and never recomputed.
pub fn resolve_rate(machine: Option<&Machine>, waste_type: WasteType, weight: Grams, points: Money) -> f64 {
    if let Some(rate) = machine.and_then(|m| m.rate_for(waste_type)) {
        return rate;
    }
    let kg = weight.as_kg();
    if kg > 0.0 {
        points.to_value() / kg
    } else {
        0.0
    }
}

/// Values a deposit at the resolved rate, rounding to cents once.
pub fn value_for(weight: Grams, rate_per_kg: f64) -> Money {
    Money::from_value(weight.as_kg() * rate_per_kg)
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;

    fn machine() -> Machine {
        Machine {
            id: 1,
            device_no: "GCM-0001".to_string(),
            merchant_id: 1,
            name: None,
            rate_plastic: Some(0.30),
            rate_paper: Some(0.20),
            rate_can: None,
            rate_uco: Some(1.10),
            rate_glass: None,
            bin_weight_1: Grams::default(),
            bin_weight_2: Grams::default(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn configured_rate_wins() {
        let m = machine();
        let rate = resolve_rate(Some(&m), WasteType::Plastic, Grams::from_kg(2.5), Money::from_value(99.0));
        assert_eq!(rate, 0.30);
        assert_eq!(value_for(Grams::from_kg(2.5), rate), Money::from_value(0.75));
    }

    #[test]
    fn missing_rate_falls_back_to_implied() {
        let m = machine();
        // No configured can rate; 0.9 points over 3kg implies 0.30/kg.
        let rate = resolve_rate(Some(&m), WasteType::Can, Grams::from_kg(3.0), Money::from_value(0.90));
        assert!((rate - 0.30).abs() < 1e-9);
    }

    #[test]
    fn no_machine_uses_implied_rate() {
        let rate = resolve_rate(None, WasteType::Paper, Grams::from_kg(2.0), Money::from_value(0.40));
        assert!((rate - 0.20).abs() < 1e-9);
    }

    #[test]
    fn zero_weight_rates_at_zero() {
        let rate = resolve_rate(None, WasteType::Plastic, Grams::default(), Money::from_value(5.0));
        assert_eq!(rate, 0.0);
        assert!(value_for(Grams::default(), rate).is_zero());
    }
}
