//! Class-label table for the car classifier.
//!
//! The classifier's output vector is indexed by class id; the mapping
//! from index to human-readable label is fixed at model-build time and
//! shipped as a JSON array side file (`class_names.json`). Index order
//! in the file is the class order of the model output.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ordered table of class labels, loaded once at startup and read-only
/// thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    /// Build a label table from an ordered list of names.
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::Labels("label table is empty".to_string()));
        }
        Ok(Self { names })
    }

    /// Load the label table from a JSON array file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "class label file not found at {}",
                path.display()
            )));
        }

        let reader = BufReader::new(File::open(path)?);
        let names: Vec<String> = serde_json::from_reader(reader)
            .map_err(|e| Error::Labels(format!("failed to parse {}: {}", path.display(), e)))?;

        Self::new(names)
    }

    /// Label for a class index, if in range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over labels in class-index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Verify that a model output vector of `len` classes matches this
    /// table. A mismatch is a startup/artifact configuration error and
    /// must fail loudly rather than be silently truncated.
    pub fn expect_len(&self, len: usize) -> Result<()> {
        if self.names.len() != len {
            return Err(Error::Config(format!(
                "model outputs {} classes but the label table has {} entries",
                len,
                self.names.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClassLabels {
        let names: Vec<String> = ["Acura RL Sedan 2012", "Acura TL Sedan 2012", "Audi A5 Coupe 2012"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        ClassLabels::new(names).unwrap()
    }

    #[test]
    fn test_get_by_index() {
        let labels = sample();
        assert_eq!(labels.get(0), Some("Acura RL Sedan 2012"));
        assert_eq!(labels.get(2), Some("Audi A5 Coupe 2012"));
        assert_eq!(labels.get(3), None);
    }

    #[test]
    fn test_len() {
        let labels = sample();
        assert_eq!(labels.len(), 3);
        assert!(!labels.is_empty());
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(ClassLabels::new(Vec::new()).is_err());
    }

    #[test]
    fn test_expect_len_mismatch() {
        let labels = sample();
        assert!(labels.expect_len(3).is_ok());

        let err = labels.expect_len(196).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_parse_json_array() {
        let json = r#"["AM General Hummer SUV 2000", "Dodge Ram Pickup 3500 Crew Cab 2010"]"#;
        let names: Vec<String> = serde_json::from_str(json).unwrap();
        let labels = ClassLabels::new(names).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get(0), Some("AM General Hummer SUV 2000"));
    }

    #[test]
    fn test_missing_file() {
        let err = ClassLabels::from_json_file(Path::new("/nonexistent/class_names.json")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
