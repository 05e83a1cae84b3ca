//! Specification records and the label sanitization rule.
//!
//! Source data is heterogeneous and dirty, so every field is free text.
//! The store key is derived from the raw class label by one shared
//! sanitization function; the seeding tool and the lookup path must use
//! the same rule or lookups silently miss.

use serde::{Deserialize, Serialize};

/// Marker for spec fields that could not be resolved.
pub const UNAVAILABLE: &str = "unavailable";

/// Placeholder for an unknown model year.
pub const YEAR_PLACEHOLDER: &str = "----";

fn unavailable() -> String {
    UNAVAILABLE.to_string()
}

fn default_make() -> String {
    "Car".to_string()
}

fn default_year() -> String {
    YEAR_PLACEHOLDER.to_string()
}

/// Performance and provenance details of a car.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecSheet {
    #[serde(default = "unavailable")]
    pub horsepower: String,
    #[serde(default = "unavailable")]
    pub acceleration: String,
    #[serde(default = "unavailable")]
    pub fuel_type: String,
    #[serde(default = "unavailable")]
    pub origin: String,
}

impl Default for SpecSheet {
    fn default() -> Self {
        Self {
            horsepower: unavailable(),
            acceleration: unavailable(),
            fuel_type: unavailable(),
            origin: unavailable(),
        }
    }
}

/// One specification record, keyed by the sanitized class label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecRecord {
    /// Sanitized store key
    #[serde(default)]
    pub id: String,
    /// Display name ("Make Model")
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_make")]
    pub make: String,
    #[serde(default)]
    pub model: String,
    /// Model year; may be a non-numeric placeholder
    #[serde(default = "default_year")]
    pub year: String,
    #[serde(default = "unavailable")]
    pub body_type: String,
    #[serde(default)]
    pub specs: SpecSheet,
}

/// Derive the store key from a raw class label. Forward slashes are not
/// valid in document keys, so they are replaced. Used identically by
/// the read path and the seeding tool.
pub fn sanitize_key(label: &str) -> String {
    label.trim().replace('/', "_")
}

/// Best-effort record derived purely from the label string, used when
/// the store has no entry (or no store is configured). Deterministic
/// and total for any non-empty label: never panics, never errors.
///
/// `"Acura RL Sedan 2012"` becomes make `"Acura"`, model `"RL Sedan"`,
/// year `"2012"`; all spec fields read "unavailable".
pub fn fallback_record(raw_label: &str) -> SpecRecord {
    let display = raw_label.trim();
    let key = sanitize_key(raw_label);

    let mut parts: Vec<&str> = key.split_whitespace().collect();

    let mut year = YEAR_PLACEHOLDER.to_string();
    let ends_with_year = parts.len() > 1
        && parts
            .last()
            .is_some_and(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()));
    if ends_with_year {
        if let Some(last) = parts.pop() {
            year = last.to_string();
        }
    }

    let make = parts
        .first()
        .map(|s| s.to_string())
        .unwrap_or_else(|| display.to_string());
    let model = if parts.len() > 1 {
        parts[1..].join(" ")
    } else {
        make.clone()
    };

    SpecRecord {
        id: key,
        name: display.to_string(),
        make,
        model,
        year,
        body_type: unavailable(),
        specs: SpecSheet::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_slashes() {
        assert_eq!(sanitize_key("Dodge Ram/SRT10"), "Dodge Ram_SRT10");
        assert_eq!(
            sanitize_key("Ram C/V Cargo Van Minivan 2012"),
            "Ram C_V Cargo Van Minivan 2012"
        );
        assert_eq!(sanitize_key("  Acura RL Sedan 2012  "), "Acura RL Sedan 2012");
    }

    #[test]
    fn test_fallback_parses_make_model_year() {
        let record = fallback_record("Acura RL Sedan 2012");

        assert_eq!(record.make, "Acura");
        assert_eq!(record.model, "RL Sedan");
        assert_eq!(record.year, "2012");
        assert_eq!(record.specs.horsepower, UNAVAILABLE);
        assert_eq!(record.specs.acceleration, UNAVAILABLE);
        assert_eq!(record.specs.fuel_type, UNAVAILABLE);
        assert_eq!(record.specs.origin, UNAVAILABLE);
        assert_eq!(record.body_type, UNAVAILABLE);
    }

    #[test]
    fn test_fallback_without_trailing_year() {
        let record = fallback_record("Tesla Model S");

        assert_eq!(record.make, "Tesla");
        assert_eq!(record.model, "Model S");
        assert_eq!(record.year, YEAR_PLACEHOLDER);
    }

    #[test]
    fn test_fallback_single_token() {
        // A lone numeric token is not popped as a year.
        let record = fallback_record("2012");
        assert_eq!(record.make, "2012");
        assert_eq!(record.model, "2012");
        assert_eq!(record.year, YEAR_PLACEHOLDER);

        let record = fallback_record("Jeep");
        assert_eq!(record.make, "Jeep");
        assert_eq!(record.model, "Jeep");
    }

    #[test]
    fn test_fallback_is_total_for_odd_labels() {
        for label in ["   a   ", "a/b/c 1999", "Smart fortwo Convertible 2012"] {
            let record = fallback_record(label);
            assert!(!record.make.is_empty());
        }
    }

    #[test]
    fn test_record_deserializes_with_field_defaults() {
        // A store document missing sub-fields fills in defaults.
        let record: SpecRecord =
            serde_json::from_str(r#"{"model": "RL", "specs": {"horsepower": "300 hp"}}"#).unwrap();

        assert_eq!(record.make, "Car");
        assert_eq!(record.year, YEAR_PLACEHOLDER);
        assert_eq!(record.specs.horsepower, "300 hp");
        assert_eq!(record.specs.origin, UNAVAILABLE);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = fallback_record("Acura RL Sedan 2012");
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.contains("\"bodyType\""));
        assert!(json.contains("\"fuelType\""));
        assert!(!json.contains("body_type"));
    }
}
