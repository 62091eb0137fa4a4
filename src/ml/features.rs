//! Feature matrix extraction from tabular payloads.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{PropensityError, Result};
use crate::table::Table;

/// Named model inputs plus categorical encodings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Column names in model input order.
    pub features: Vec<String>,
    /// Per-column map from categorical value to numeric code.
    #[serde(default)]
    pub categories: HashMap<String, HashMap<String, f64>>,
}

impl FeatureSchema {
    pub fn new(features: Vec<String>) -> Self {
        Self {
            features,
            categories: HashMap::new(),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.features.is_empty() {
            return Err("features must not be empty".to_string());
        }
        let mut seen = HashSet::new();
        for name in &self.features {
            if name.is_empty() {
                return Err("feature names must not be empty".to_string());
            }
            if !seen.insert(name.as_str()) {
                return Err(format!("duplicate feature {name}"));
            }
        }
        for (column, codes) in &self.categories {
            if !seen.contains(column.as_str()) {
                return Err(format!("categories given for unknown feature {column}"));
            }
            if codes.values().any(|v| !v.is_finite()) {
                return Err(format!("categories for {column} contain non-finite codes"));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// One row of `features.len()` values per table row.
    pub fn extract(&self, table: &Table) -> Result<Vec<Vec<f64>>> {
        let indices = self
            .features
            .iter()
            .map(|name| {
                table.column_index(name).ok_or_else(|| {
                    PropensityError::FeatureMismatch(format!("missing column {name}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        table
            .rows()
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                indices
                    .iter()
                    .zip(&self.features)
                    .map(|(&col, name)| self.encode(name, &row[col], row_idx))
                    .collect()
            })
            .collect()
    }

    fn encode(&self, column: &str, cell: &str, row_idx: usize) -> Result<f64> {
        let cell = cell.trim();
        if let Some(code) = self.categories.get(column).and_then(|m| m.get(cell)) {
            return Ok(*code);
        }
        match cell.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(PropensityError::FeatureMismatch(format!(
                "row {}: column {column} has unencodable value {cell:?}",
                row_idx + 1
            ))),
        }
    }
}
