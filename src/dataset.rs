// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Prepared dataset files
//!
//! A dataset is the already-merged input of one run: recipient records,
//! manufacturer records and pairwise relation weights. JSON and TOML are
//! accepted, chosen by file extension.

use crate::builder::RelationWeights;
use crate::types::NodeRecord;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// One pairwise relation between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// First entity id
    pub source: String,
    /// Second entity id
    pub target: String,
    /// Relation strength
    pub weight: f64,
}

/// Input of a single run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Entities that receive supply
    #[serde(default)]
    pub recipients: Vec<NodeRecord>,
    /// Entities that produce supply
    #[serde(default)]
    pub manufacturers: Vec<NodeRecord>,
    /// Pairwise relation weights
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl Dataset {
    /// Load a dataset from a `.json` or `.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        let dataset = match extension.as_deref() {
            Some("toml") => Self::from_toml(&content),
            Some("json") | None => Self::from_json(&content),
            Some(other) => anyhow::bail!(
                "Unsupported dataset format: .{}. Supported: json, toml",
                other
            ),
        }
        .with_context(|| format!("Failed to parse dataset {}", path.display()))?;

        debug!(
            "Loaded {} recipients, {} manufacturers, {} relations from {}",
            dataset.recipients.len(),
            dataset.manufacturers.len(),
            dataset.relations.len(),
            path.display()
        );
        Ok(dataset)
    }

    /// Parse a JSON dataset
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parse a TOML dataset
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Ids of every listed manufacturer
    #[must_use]
    pub fn manufacturer_ids(&self) -> HashSet<String> {
        self.manufacturers.iter().map(|m| m.id.clone()).collect()
    }

    /// Split into the builder inputs: node records, relation weights and the
    /// manufacturer id set.
    ///
    /// An id listed as both manufacturer and recipient yields one record,
    /// taken from the manufacturer list with missing fields filled from the
    /// recipient entry. Later duplicate relations overwrite earlier ones.
    #[must_use]
    pub fn into_parts(self) -> (Vec<NodeRecord>, RelationWeights, HashSet<String>) {
        let manufacturer_ids = self.manufacturer_ids();

        let mut records: Vec<NodeRecord> = self.manufacturers;
        for recipient in self.recipients {
            match records.iter_mut().find(|r| r.id == recipient.id) {
                Some(existing) if manufacturer_ids.contains(&recipient.id) => {
                    debug!("{} listed as both manufacturer and recipient", recipient.id);
                    existing.name = existing.name.take().or(recipient.name);
                    existing.population = existing.population.or(recipient.population);
                    existing.vaccination_rate =
                        existing.vaccination_rate.or(recipient.vaccination_rate);
                }
                _ => records.push(recipient),
            }
        }

        let mut weights = RelationWeights::new();
        for relation in self.relations {
            let key = (relation.source, relation.target);
            if weights.insert(key.clone(), relation.weight).is_some() {
                warn!("Duplicate relation {} - {}; keeping the last weight", key.0, key.1);
            }
        }

        (records, weights, manufacturer_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_JSON: &str = r#"{
        "recipients": [
            {"id": "KE", "name": "Kenya", "population": 2000000, "vaccination_rate": 20},
            {"id": "IN", "population": 1400000000, "vaccination_rate": 70}
        ],
        "manufacturers": [
            {"id": "IN", "name": "India", "manufacturing_capacity": 1000}
        ],
        "relations": [
            {"source": "KE", "target": "IN", "weight": 0.4}
        ]
    }"#;

    #[test]
    fn test_parse_json() {
        let dataset = Dataset::from_json(SAMPLE_JSON).unwrap();
        assert_eq!(dataset.recipients.len(), 2);
        assert_eq!(dataset.manufacturers.len(), 1);
        assert_eq!(dataset.relations[0].weight, 0.4);
    }

    #[test]
    fn test_parse_toml() {
        let content = r#"
[[recipients]]
id = "KE"
population = 2000000.0
vaccination_rate = 20.0

[[manufacturers]]
id = "US"
manufacturing_capacity = 500.0
"#;
        let dataset = Dataset::from_toml(content).unwrap();
        assert_eq!(dataset.recipients[0].id, "KE");
        assert_eq!(dataset.manufacturers[0].manufacturing_capacity, Some(500.0));
        assert!(dataset.relations.is_empty());
    }

    #[test]
    fn test_into_parts_merges_dual_listed_ids() {
        let dataset = Dataset::from_json(SAMPLE_JSON).unwrap();
        let (records, weights, manufacturers) = dataset.into_parts();

        assert_eq!(records.len(), 2);
        let india = records.iter().find(|r| r.id == "IN").unwrap();
        assert_eq!(india.name.as_deref(), Some("India"));
        assert_eq!(india.manufacturing_capacity, Some(1000.0));
        assert_eq!(india.population, Some(1.4e9));

        assert!(manufacturers.contains("IN"));
        assert_eq!(weights[&("KE".to_string(), "IN".to_string())], 0.4);
    }

    #[test]
    fn test_load_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(SAMPLE_JSON.as_bytes()).unwrap();

        let dataset = Dataset::load(file.path()).unwrap();
        assert_eq!(dataset.recipients.len(), 2);
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let err = Dataset::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported dataset format"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Dataset::load(Path::new("/nonexistent/vaxflow.json")).is_err());
    }
}
