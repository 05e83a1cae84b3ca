//! Parsing for the Stanford Cars specification CSV.
//!
//! The class-name column doubles as a packed "Make Model BodyType Year"
//! string; splitting it back apart is a best-effort heuristic (known
//! multi-word makes, body-type word stripping) inherited from the
//! dataset, not a grammar. Seeding keys records with the same
//! `sanitize_key` the lookup path uses.

use std::path::Path;

use serde::Deserialize;

use otosearch_core::{Error, Result};

use crate::record::{sanitize_key, SpecRecord, SpecSheet, UNAVAILABLE, YEAR_PLACEHOLDER};

/// Makes spelled with more than one word in the dataset.
const MULTI_WORD_MAKES: [&str; 5] = ["Aston", "Land", "Range", "AM", "Rolls-Royce"];

/// One row of the specification CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct SpecCsvRow {
    #[serde(rename = "Car Model")]
    pub car_model: String,
    #[serde(rename = "Horsepower", default)]
    pub horsepower: String,
    #[serde(rename = "Acceleration (0-60 mph)", default)]
    pub acceleration: String,
    #[serde(rename = "Fuel Type", default)]
    pub fuel_type: String,
    #[serde(rename = "Origin", default)]
    pub origin: String,
    #[serde(rename = "Body Type", default)]
    pub body_type: String,
}

/// Make/model/year split out of a packed class name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub make: String,
    pub model: String,
    pub year: String,
}

/// Split a packed class name like `"Acura RL Sedan 2012"` into make,
/// model and year, using the body type from the CSV to clean the model
/// string.
pub fn parse_car_name(full_name: &str, body_type_hint: &str) -> ParsedName {
    let parts: Vec<&str> = full_name.split_whitespace().collect();

    if parts.len() < 2 {
        let token = parts.first().copied().unwrap_or(full_name).to_string();
        return ParsedName {
            make: token.clone(),
            model: token,
            year: YEAR_PLACEHOLDER.to_string(),
        };
    }

    // Dataset names always end with the model year.
    let year = parts[parts.len() - 1].to_string();

    let mut make = parts[0].to_string();
    let mut model_start = 1;
    if MULTI_WORD_MAKES.contains(&parts[0]) {
        make = parts[..2.min(parts.len())].join(" ");
        if parts.len() > 2 && parts[2] == "General" {
            make = "AM General".to_string();
            model_start = 3;
        } else {
            model_start = 2;
        }
    }

    // Strip body-type words out of the model (whole-word, case
    // insensitive): "RL Sedan" with body "Sedan" -> "RL".
    let body_words: Vec<String> = body_type_hint
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();

    let model_end = parts.len() - 1;
    let model = parts[model_start.min(model_end)..model_end]
        .iter()
        .filter(|w| !body_words.contains(&w.to_lowercase()))
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    ParsedName { make, model, year }
}

fn clean_field(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        UNAVAILABLE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Build the store key and record for one CSV row.
pub fn record_from_row(row: &SpecCsvRow) -> (String, SpecRecord) {
    let key = sanitize_key(&row.car_model);
    let parsed = parse_car_name(&row.car_model, &row.body_type);

    let record = SpecRecord {
        id: key.clone(),
        name: format!("{} {}", parsed.make, parsed.model).trim().to_string(),
        make: parsed.make,
        model: parsed.model,
        year: parsed.year,
        body_type: clean_field(&row.body_type),
        specs: SpecSheet {
            horsepower: clean_field(&row.horsepower),
            acceleration: clean_field(&row.acceleration),
            fuel_type: clean_field(&row.fuel_type),
            origin: clean_field(&row.origin),
        },
    };

    (key, record)
}

/// Parse CSV content into rows.
pub fn parse_spec_csv(data: &str) -> Result<Vec<SpecCsvRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    reader
        .deserialize()
        .map(|row| row.map_err(|e| Error::Serialization(format!("bad CSV row: {}", e))))
        .collect()
}

/// Read the specification CSV from disk. The source sheet is exported
/// from Excel and may be Latin-1 rather than UTF-8.
pub fn read_spec_csv(path: &Path) -> Result<Vec<SpecCsvRow>> {
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "spec CSV not found at {}",
            path.display()
        )));
    }

    let bytes = std::fs::read(path)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        // Latin-1: every byte maps directly to the same code point.
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    };

    parse_spec_csv(&text)
}
