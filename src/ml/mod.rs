//! Scoring artifacts (deploy-safe inference).
//!
//! Every artifact format is exposed through [`ProbabilityScorer`]; nothing
//! outside this module depends on a concrete model type.

pub mod dense;
pub mod features;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod scorer;

pub use dense::{Activation, DenseClassifier, DenseLayer};
pub use features::FeatureSchema;
#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;
pub use scorer::{ProbabilityMatrix, ProbabilityScorer, POSITIVE_CLASS};
