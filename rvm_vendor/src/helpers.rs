//! Tolerant deserializers for the vendor's loosely-typed JSON.
//!
//! The vendor sends weights as `2.5`, `"2.5"`, `""` or nothing at all, depending on firmware version. These helpers
//! accept any of those shapes so that field-sanity handling never has to leak into business logic.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accepts a JSON number, a numeric string, null, or an absent field, and yields an `f64` (0.0 when unusable).
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where D: Deserializer<'de> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value_to_f64(value.as_ref()))
}

pub fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where D: Deserializer<'de> {
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => Ok(Some(value_to_f64(Some(&v)))),
    }
}

/// Accepts a JSON integer, a numeric string, null, or an absent field, and yields an `i64` (0 when unusable).
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where D: Deserializer<'de> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_else(|| n.as_f64().map(|f| f as i64).unwrap_or(0)),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    })
}

/// Accepts a string, a number, null, or an absent field, and yields an optional trimmed string.
/// Empty strings become `None`.
pub fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where D: Deserializer<'de> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        },
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts a JSON bool or the strings "true"/"false" and yields a `bool` (false when unusable).
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where D: Deserializer<'de> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    })
}

fn value_to_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod test {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct Shape {
        #[serde(default, deserialize_with = "lenient_f64")]
        weight: f64,
        #[serde(default, deserialize_with = "lenient_opt_string")]
        id: Option<String>,
        #[serde(default, deserialize_with = "lenient_bool")]
        is_full: bool,
    }

    #[test]
    fn accepts_strings_and_numbers() {
        let p: Shape = serde_json::from_str(r#"{"weight": "2.5", "id": 12345, "is_full": "true"}"#).unwrap();
        assert_eq!(p.weight, 2.5);
        assert_eq!(p.id.as_deref(), Some("12345"));
        assert!(p.is_full);
    }

    #[test]
    fn absent_and_garbage_fields_default() {
        let p: Shape = serde_json::from_str(r#"{"weight": "n/a", "id": ""}"#).unwrap();
        assert_eq!(p.weight, 0.0);
        assert_eq!(p.id, None);
        assert!(!p.is_full);
    }
}
