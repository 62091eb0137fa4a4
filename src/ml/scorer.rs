//! The scoring capability every loaded artifact exposes.

use std::fmt::Debug;

use crate::error::{PropensityError, Result};
use crate::table::Table;

/// Index of the positive class in a probability row.
pub const POSITIVE_CLASS: usize = 1;

/// A trained binary classifier.
///
/// Implementations select their own feature columns from the table by name,
/// so label or passthrough columns in the payload are ignored.
pub trait ProbabilityScorer: Send + Sync + Debug {
    /// Per-row `[P(class0), P(class1)]`, one entry per table row.
    fn predict_probabilities(&self, table: &Table) -> Result<ProbabilityMatrix>;

    /// Feature columns in model input order.
    fn features(&self) -> &[String];
}

/// Validated classifier output.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityMatrix {
    rows: Vec<[f64; 2]>,
}

impl ProbabilityMatrix {
    /// Build from raw scorer rows. Each row needs at least two finite values in
    /// [0, 1]; there must be exactly `expected_rows` rows.
    pub fn from_rows(rows: Vec<Vec<f64>>, expected_rows: usize) -> Result<Self> {
        if rows.len() != expected_rows {
            return Err(PropensityError::Scoring(format!(
                "scorer returned {} rows for {} inputs",
                rows.len(),
                expected_rows
            )));
        }

        let mut out = Vec::with_capacity(rows.len());
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() <= POSITIVE_CLASS {
                return Err(PropensityError::Scoring(format!(
                    "row {idx}: expected at least 2 class probabilities, got {}",
                    row.len()
                )));
            }
            let pair = [row[0], row[POSITIVE_CLASS]];
            if pair.iter().any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0) {
                return Err(PropensityError::Scoring(format!(
                    "row {idx}: probabilities out of range: {pair:?}"
                )));
            }
            out.push(pair);
        }

        Ok(Self { rows: out })
    }

    /// Rows from single positive-class probabilities.
    pub fn from_positive(positive: Vec<f64>, expected_rows: usize) -> Result<Self> {
        let rows = positive.into_iter().map(|p| vec![1.0 - p, p]).collect();
        Self::from_rows(rows, expected_rows)
    }

    pub fn rows(&self) -> &[[f64; 2]] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Positive-class column.
    pub fn positive(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r[POSITIVE_CLASS]).collect()
    }
}
