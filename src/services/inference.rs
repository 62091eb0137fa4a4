//! CSV in, annotated TSV out.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{PropensityError, Result};
use crate::ml::{ProbabilityMatrix, ProbabilityScorer};
use crate::services::model_loader::ModelLoader;
use crate::table::Table;

/// Column appended to every response.
pub const OUTPUT_COLUMN: &str = "propensity_output";

/// Field separator of response bodies.
pub const OUTPUT_DELIMITER: u8 = b'\t';

/// Result of one `/invocations` call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub body: Vec<u8>,
    pub rows: usize,
}

/// Class probabilities for every row. Header-only tables never reach the scorer.
pub fn predict(scorer: &dyn ProbabilityScorer, table: &Table) -> Result<ProbabilityMatrix> {
    if table.is_empty() {
        return ProbabilityMatrix::from_rows(Vec::new(), 0);
    }
    scorer.predict_probabilities(table)
}

/// Write the positive-class probability into [`OUTPUT_COLUMN`], replacing an
/// input column of that name in place.
pub fn annotate(scorer: &dyn ProbabilityScorer, mut table: Table) -> Result<Table> {
    let probabilities = predict(scorer, &table)?;
    let values = probabilities
        .positive()
        .iter()
        .map(|p| format_probability(*p))
        .collect();
    table.set_column(OUTPUT_COLUMN, values)?;
    Ok(table)
}

/// Always carries a fractional part, so `1.0` never reads as the integer `1`.
fn format_probability(p: f64) -> String {
    format!("{p:?}")
}

/// Parse, score and serialize one payload.
pub fn transform(scorer: &dyn ProbabilityScorer, body: &[u8]) -> Result<Invocation> {
    let table = Table::from_csv(body)?;
    let rows = table.row_count();
    let annotated = annotate(scorer, table)?;
    Ok(Invocation {
        body: annotated.to_delimited(OUTPUT_DELIMITER)?,
        rows,
    })
}

/// Health check and prediction on top of the shared [`ModelLoader`].
#[derive(Debug, Clone)]
pub struct InferencePipeline {
    loader: Arc<ModelLoader>,
}

impl InferencePipeline {
    pub fn new(loader: Arc<ModelLoader>) -> Self {
        Self { loader }
    }

    /// True when the artifact is (or can now be) loaded.
    pub async fn health_check(&self) -> bool {
        match self.loader.get_model().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Health check failed: {}", e);
                false
            }
        }
    }

    /// Score a CSV body. Parsing and scoring run on the blocking pool.
    pub async fn invoke(&self, body: Vec<u8>) -> Result<Invocation> {
        let scorer = self.loader.get_model().await?;

        let invocation = tokio::task::spawn_blocking(move || transform(scorer.as_ref(), &body))
            .await
            .map_err(|e| PropensityError::Internal(format!("inference task failed: {e}")))??;

        info!("Invoked with {} records", invocation.rows);
        Ok(invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scores `age / 100`.
    #[derive(Debug)]
    struct AgeScorer {
        features: Vec<String>,
    }

    impl AgeScorer {
        fn new() -> Self {
            Self {
                features: vec!["age".to_string()],
            }
        }
    }

    impl ProbabilityScorer for AgeScorer {
        fn predict_probabilities(&self, table: &Table) -> Result<ProbabilityMatrix> {
            let idx = table
                .column_index("age")
                .ok_or_else(|| PropensityError::FeatureMismatch("missing column age".into()))?;
            let positive = table
                .column(idx)
                .map(|v| v.parse::<f64>().map(|a| a / 100.0))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| PropensityError::FeatureMismatch(e.to_string()))?;
            ProbabilityMatrix::from_positive(positive, table.row_count())
        }

        fn features(&self) -> &[String] {
            &self.features
        }
    }

    #[test]
    fn transform_appends_output_column_as_tsv() {
        let out = transform(&AgeScorer::new(), b"age,income\n30,50000\n45,70000\n").unwrap();
        assert_eq!(out.rows, 2);
        assert_eq!(
            String::from_utf8(out.body).unwrap(),
            "age\tincome\tpropensity_output\n30\t50000\t0.3\n45\t70000\t0.45\n"
        );
    }

    #[test]
    fn existing_output_column_is_overwritten_in_place() {
        let out = transform(
            &AgeScorer::new(),
            b"propensity_output,age\nstale,100\nstale,0\n",
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out.body).unwrap(),
            "propensity_output\tage\n1.0\t100\n0.0\t0\n"
        );
    }

    #[test]
    fn saturated_probabilities_keep_a_fractional_part() {
        assert_eq!(format_probability(1.0), "1.0");
        assert_eq!(format_probability(0.0), "0.0");
        assert_eq!(format_probability(0.45), "0.45");
    }

    #[test]
    fn header_only_payload_skips_the_scorer() {
        let out = transform(&AgeScorer::new(), b"income\n").unwrap();
        assert_eq!(out.rows, 0);
        assert_eq!(
            String::from_utf8(out.body).unwrap(),
            "income\tpropensity_output\n"
        );
    }

    #[test]
    fn scoring_errors_propagate() {
        let err = transform(&AgeScorer::new(), b"income\n1\n").unwrap_err();
        assert!(matches!(err, PropensityError::FeatureMismatch(_)));
    }

    #[test]
    fn malformed_payload_propagates() {
        let err = transform(&AgeScorer::new(), b"age,income\n30\n").unwrap_err();
        assert!(matches!(err, PropensityError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn health_check_fails_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::AppConfig::default_config().model;
        config.base_path = dir.path().to_path_buf();
        let pipeline = InferencePipeline::new(Arc::new(ModelLoader::new(config)));

        assert!(!pipeline.health_check().await);
    }

    #[tokio::test]
    async fn pipeline_uses_preloaded_scorer() {
        let loader = Arc::new(ModelLoader::with_scorer(
            crate::config::AppConfig::default_config().model,
            Arc::new(AgeScorer::new()),
        ));
        let pipeline = InferencePipeline::new(loader);

        assert!(pipeline.health_check().await);
        let out = pipeline.invoke(b"age\n50\n".to_vec()).await.unwrap();
        assert_eq!(String::from_utf8(out.body).unwrap(), "age\tpropensity_output\n50\t0.5\n");
    }
}
