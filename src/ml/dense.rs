//! Dense neural network classifier (CPU-only).
//!
//! Small MLPs loaded from JSON. The artifact carries its own feature schema,
//! so columns are picked from the payload by name.
//!
//! Output layer conventions:
//! - one unit with `sigmoid`: P(class1)
//! - two units with `softmax`: class probabilities
//! - two units with `linear`: class logits, softmaxed here

use serde::{Deserialize, Serialize};

use crate::error::{PropensityError, Result};
use crate::ml::features::FeatureSchema;
use crate::ml::scorer::{ProbabilityMatrix, ProbabilityScorer};
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    Tanh,
    Sigmoid,
    Softmax,
}

impl Default for Activation {
    fn default() -> Self {
        Self::Linear
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weights shape: [out_dim][in_dim]
    pub weights: Vec<Vec<f64>>,
    /// Bias shape: [out_dim]
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn in_dim(&self) -> usize {
        self.weights.first().map(|r| r.len()).unwrap_or(0)
    }

    fn out_dim(&self) -> usize {
        self.weights.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseClassifier {
    #[serde(flatten)]
    pub schema: FeatureSchema,

    /// Optional z-score normalization.
    #[serde(default)]
    pub input_mean: Option<Vec<f64>>,
    #[serde(default)]
    pub input_std: Option<Vec<f64>>,

    pub layers: Vec<DenseLayer>,

    /// Optional free-form metadata (versioning, training info, etc).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl DenseClassifier {
    pub fn from_json(content: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(content)
            .map_err(|e| PropensityError::ModelLoad(format!("invalid artifact: {e}")))?;
        model
            .validate()
            .map_err(|e| PropensityError::ModelLoad(format!("invalid artifact: {e}")))?;
        Ok(model)
    }

    pub fn input_dim(&self) -> usize {
        self.schema.len()
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.schema.validate()?;
        let input_dim = self.input_dim();

        if self.layers.is_empty() {
            return Err("layers must not be empty".to_string());
        }
        if let (Some(mean), Some(std)) = (&self.input_mean, &self.input_std) {
            if mean.len() != input_dim {
                return Err(format!(
                    "input_mean length {} != feature count {}",
                    mean.len(),
                    input_dim
                ));
            }
            if std.len() != input_dim {
                return Err(format!(
                    "input_std length {} != feature count {}",
                    std.len(),
                    input_dim
                ));
            }
            if mean.iter().any(|v| !v.is_finite()) {
                return Err("input_mean must be finite".to_string());
            }
            if std.iter().any(|v| !v.is_finite() || *v <= 0.0) {
                return Err("input_std must be finite and > 0".to_string());
            }
        } else if self.input_mean.is_some() || self.input_std.is_some() {
            return Err("input_mean and input_std must be provided together".to_string());
        }

        let mut expected_in = input_dim;
        for (idx, layer) in self.layers.iter().enumerate() {
            if layer.out_dim() == 0 {
                return Err(format!("layer[{idx}] out_dim must be > 0"));
            }
            if layer.bias.len() != layer.out_dim() {
                return Err(format!(
                    "layer[{idx}] bias len {} != out_dim {}",
                    layer.bias.len(),
                    layer.out_dim()
                ));
            }
            for (r, row) in layer.weights.iter().enumerate() {
                if row.len() != expected_in {
                    return Err(format!(
                        "layer[{idx}] weights row {r} len {} != expected in_dim {expected_in}",
                        row.len()
                    ));
                }
                if row.iter().any(|v| !v.is_finite()) {
                    return Err(format!("layer[{idx}] weights contain non-finite values"));
                }
            }
            if layer.bias.iter().any(|v| !v.is_finite()) {
                return Err(format!("layer[{idx}] bias contain non-finite values"));
            }
            expected_in = layer.out_dim();
        }

        match self.output_head() {
            Some(_) => Ok(()),
            None => Err(
                "output layer must be 1 unit with sigmoid, or 2 units with softmax or linear"
                    .to_string(),
            ),
        }
    }

    fn output_head(&self) -> Option<OutputHead> {
        let last = self.layers.last()?;
        match (last.out_dim(), last.activation) {
            (1, Activation::Sigmoid) => Some(OutputHead::Positive),
            (2, Activation::Softmax) => Some(OutputHead::Probabilities),
            (2, Activation::Linear) => Some(OutputHead::Logits),
            _ => None,
        }
    }

    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.input_dim() {
            return Err(PropensityError::FeatureMismatch(format!(
                "DenseClassifier input dim mismatch: got {}, expected {}",
                input.len(),
                self.input_dim()
            )));
        }

        let mut x: Vec<f64> = input.to_vec();

        if let (Some(mean), Some(std)) = (&self.input_mean, &self.input_std) {
            for i in 0..x.len() {
                let denom = std[i].max(1e-12);
                x[i] = (x[i] - mean[i]) / denom;
            }
        }

        for layer in &self.layers {
            let in_dim = layer.in_dim();
            let mut y: Vec<f64> = layer
                .weights
                .iter()
                .zip(&layer.bias)
                .map(|(row, bias)| {
                    debug_assert_eq!(row.len(), in_dim);
                    bias + row.iter().zip(&x).map(|(w, v)| w * v).sum::<f64>()
                })
                .collect();
            apply_activation(&mut y, layer.activation);
            x = y;
        }

        Ok(x)
    }

    /// `[P(class0), P(class1)]` for one feature vector.
    pub fn forward_proba(&self, input: &[f64]) -> Result<Vec<f64>> {
        let mut out = self.forward(input)?;
        match self.output_head() {
            Some(OutputHead::Positive) => Ok(vec![1.0 - out[0], out[0]]),
            Some(OutputHead::Probabilities) => Ok(out),
            Some(OutputHead::Logits) => {
                softmax(&mut out);
                Ok(out)
            }
            None => Err(PropensityError::Scoring(
                "output layer is not a binary classifier head".to_string(),
            )),
        }
    }
}

impl ProbabilityScorer for DenseClassifier {
    fn predict_probabilities(&self, table: &Table) -> Result<ProbabilityMatrix> {
        let rows = self
            .schema
            .extract(table)?
            .iter()
            .map(|features| self.forward_proba(features))
            .collect::<Result<Vec<_>>>()?;
        ProbabilityMatrix::from_rows(rows, table.row_count())
    }

    fn features(&self) -> &[String] {
        &self.schema.features
    }
}

#[derive(Debug, Clone, Copy)]
enum OutputHead {
    Positive,
    Probabilities,
    Logits,
}

fn apply_activation(values: &mut [f64], act: Activation) {
    match act {
        Activation::Linear => {}
        Activation::Relu => values.iter_mut().for_each(|v| *v = v.max(0.0)),
        Activation::Tanh => values.iter_mut().for_each(|v| *v = v.tanh()),
        Activation::Sigmoid => values.iter_mut().for_each(|v| *v = sigmoid(*v)),
        Activation::Softmax => softmax(values),
    }
}

fn sigmoid(x: f64) -> f64 {
    // Numerically-stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

fn softmax(values: &mut [f64]) {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logistic(weights: Vec<f64>) -> DenseClassifier {
        let features = (0..weights.len()).map(|i| format!("x{i}")).collect();
        DenseClassifier {
            schema: FeatureSchema::new(features),
            input_mean: None,
            input_std: None,
            layers: vec![DenseLayer {
                weights: vec![weights],
                bias: vec![0.0],
                activation: Activation::Sigmoid,
            }],
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn forward_proba_sigmoid_head() {
        let net = logistic(vec![1.0, 2.0]);
        net.validate().unwrap();

        let p0 = net.forward_proba(&[0.0, 0.0]).unwrap();
        assert!((p0[1] - 0.5).abs() < 1e-12);

        let p1 = net.forward_proba(&[1.0, 0.0]).unwrap();
        assert!(p1[1] > 0.5);
        assert!((p1[0] + p1[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn logits_head_is_softmaxed() {
        let mut net = logistic(vec![1.0]);
        net.layers = vec![DenseLayer {
            weights: vec![vec![0.0], vec![1.0]],
            bias: vec![0.0, 0.0],
            activation: Activation::Linear,
        }];
        net.validate().unwrap();

        let p = net.forward_proba(&[2.0]).unwrap();
        assert!((p[0] + p[1] - 1.0).abs() < 1e-12);
        assert!(p[1] > p[0]);
    }

    #[test]
    fn validates_shapes() {
        let mut bad = logistic(vec![1.0, 2.0]);
        bad.schema = FeatureSchema::new(vec!["a".into(), "b".into(), "c".into()]);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn rejects_non_classifier_head() {
        let mut net = logistic(vec![1.0]);
        net.layers[0].activation = Activation::Relu;
        assert!(net.validate().is_err());
    }

    #[test]
    fn loads_from_json_and_scores_table() {
        let net = DenseClassifier::from_json(
            r#"{
                "features": ["age", "plan"],
                "categories": {"plan": {"basic": 0.0, "gold": 1.0}},
                "input_mean": [40.0, 0.5],
                "input_std": [10.0, 0.5],
                "layers": [{"weights": [[0.3, -1.2]], "bias": [0.1], "activation": "sigmoid"}]
            }"#,
        )
        .unwrap();

        let table = Table::from_csv(b"plan,age,label\ngold,30,1\nbasic,45,0\n").unwrap();
        let probs = net.predict_probabilities(&table).unwrap();
        assert_eq!(probs.len(), 2);
        for p in probs.positive() {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn corrupt_json_is_a_load_error() {
        let err = DenseClassifier::from_json("{not json").unwrap_err();
        assert!(matches!(err, PropensityError::ModelLoad(_)));
    }
}
