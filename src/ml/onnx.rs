//! ONNX classifier wrapper (pure Rust via `tract-onnx`).
//!
//! The graph is specialized to a fixed `[1, k]` f32 input and run once per
//! row. Its first output must hold either the class probabilities (2 values)
//! or the positive-class probability (1 value).

use crate::error::{PropensityError, Result};
use crate::ml::features::FeatureSchema;
use crate::ml::scorer::{ProbabilityMatrix, ProbabilityScorer};
use crate::table::Table;

use std::path::Path;
use tract_onnx::prelude::*;

#[derive(Clone)]
pub struct OnnxClassifier {
    plan: TypedRunnableModel<TypedModel>,
    schema: FeatureSchema,
    output_dim: usize,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("features", &self.schema.features)
            .field("output_dim", &self.output_dim)
            .finish()
    }
}

impl OnnxClassifier {
    /// Load a graph whose input row is `schema.features`, in order.
    pub fn load<P: AsRef<Path>>(path: P, schema: FeatureSchema) -> Result<Self> {
        schema
            .validate()
            .map_err(|e| PropensityError::ModelLoad(format!("invalid feature list: {e}")))?;
        let input_shape = [1, schema.len()];

        let plan = tract_onnx::onnx()
            .model_for_path(path.as_ref())
            .map_err(|e| PropensityError::ModelLoad(format!("onnx load failed: {e}")))?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(1, schema.len())))
            .map_err(|e| PropensityError::ModelLoad(format!("onnx input fact failed: {e}")))?
            .into_optimized()
            .map_err(|e| PropensityError::ModelLoad(format!("onnx optimize failed: {e}")))?
            .into_runnable()
            .map_err(|e| PropensityError::ModelLoad(format!("onnx runnable failed: {e}")))?;

        // Infer output_dim by running a dummy forward pass.
        let dummy = tract_ndarray::ArrayD::<f32>::zeros(tract_ndarray::IxDyn(&input_shape))
            .into_tvalue();
        let outputs = plan
            .run(tvec!(dummy))
            .map_err(|e| PropensityError::ModelLoad(format!("onnx run failed: {e}")))?;
        let output_dim = outputs
            .first()
            .ok_or_else(|| PropensityError::ModelLoad("onnx produced no outputs".to_string()))?
            .to_array_view::<f32>()
            .map_err(|e| PropensityError::ModelLoad(format!("onnx output decode failed: {e}")))?
            .len();
        if output_dim != 1 && output_dim != 2 {
            return Err(PropensityError::ModelLoad(format!(
                "onnx output must have 1 or 2 values per row, got {output_dim}"
            )));
        }

        Ok(Self {
            plan,
            schema,
            output_dim,
        })
    }

    /// Run inference on a single feature vector.
    fn predict_row(&self, input: &[f64]) -> Result<Vec<f64>> {
        let input: Vec<f32> = input.iter().map(|v| *v as f32).collect();
        let tensor = tract_ndarray::ArrayD::<f32>::from_shape_vec(
            tract_ndarray::IxDyn(&[1, self.schema.len()]),
            input,
        )
        .map_err(|e| PropensityError::Scoring(format!("onnx input reshape failed: {e}")))?
        .into_tvalue();

        let outputs = self
            .plan
            .run(tvec!(tensor))
            .map_err(|e| PropensityError::Scoring(format!("onnx run failed: {e}")))?;
        let arr = outputs
            .first()
            .ok_or_else(|| PropensityError::Scoring("onnx produced no outputs".to_string()))?
            .to_array_view::<f32>()
            .map_err(|e| PropensityError::Scoring(format!("onnx output decode failed: {e}")))?;

        let values: Vec<f64> = arr.iter().map(|v| *v as f64).collect();
        if self.output_dim == 1 {
            let p = values.first().copied().unwrap_or(f64::NAN);
            Ok(vec![1.0 - p, p])
        } else {
            Ok(values)
        }
    }
}

impl ProbabilityScorer for OnnxClassifier {
    fn predict_probabilities(&self, table: &Table) -> Result<ProbabilityMatrix> {
        let rows = self
            .schema
            .extract(table)?
            .iter()
            .map(|features| self.predict_row(features))
            .collect::<Result<Vec<_>>>()?;
        ProbabilityMatrix::from_rows(rows, table.row_count())
    }

    fn features(&self) -> &[String] {
        &self.schema.features
    }
}
