//! Lazily loaded, process-wide scoring artifact.
//!
//! The artifact is read on the first call to [`ModelLoader::get_model`] and
//! kept for the life of the process. Concurrent first calls wait on the same
//! load; a failed load leaves the loader empty so a later call can retry.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::{ModelConfig, ModelFormat};
use crate::error::{PropensityError, Result};
use crate::ml::{DenseClassifier, ProbabilityScorer};

pub type SharedScorer = Arc<dyn ProbabilityScorer>;

pub struct ModelLoader {
    config: ModelConfig,
    model: OnceCell<SharedScorer>,
}

impl ModelLoader {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    /// A loader that already holds `scorer` and never touches disk.
    pub fn with_scorer(config: ModelConfig, scorer: SharedScorer) -> Self {
        Self {
            config,
            model: OnceCell::new_with(Some(scorer)),
        }
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.config.artifact_path()
    }

    /// Whether the artifact is in memory. Never triggers a load.
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Cached artifact, loading it on first use.
    pub async fn get_model(&self) -> Result<SharedScorer> {
        let model = self
            .model
            .get_or_try_init(|| async {
                let config = self.config.clone();
                let path = config.artifact_path();
                debug!("Loading model artifact from {}", path.display());

                let scorer = tokio::task::spawn_blocking(move || load_artifact(&config))
                    .await
                    .map_err(|e| PropensityError::Internal(format!("model load task failed: {e}")))?
                    .inspect_err(|e| warn!("Model load from {} failed: {}", path.display(), e))?;

                info!(
                    "Loaded model from {} ({} features)",
                    path.display(),
                    scorer.features().len()
                );
                Ok::<_, PropensityError>(scorer)
            })
            .await?;

        Ok(Arc::clone(model))
    }
}

impl std::fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelLoader")
            .field("artifact", &self.config.artifact_path())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Read and deserialize the configured artifact. Blocking.
pub fn load_artifact(config: &ModelConfig) -> Result<SharedScorer> {
    let path = config.artifact_path();
    if !path.is_file() {
        return Err(PropensityError::ModelLoad(format!(
            "artifact not found at {}",
            path.display()
        )));
    }

    match config.format {
        ModelFormat::Dense => {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                PropensityError::ModelLoad(format!("failed to read {}: {e}", path.display()))
            })?;
            Ok(Arc::new(DenseClassifier::from_json(&content)?))
        }
        #[cfg(feature = "onnx")]
        ModelFormat::Onnx => {
            let schema = crate::ml::FeatureSchema::new(config.features.clone());
            Ok(Arc::new(crate::ml::OnnxClassifier::load(&path, schema)?))
        }
        #[cfg(not(feature = "onnx"))]
        ModelFormat::Onnx => Err(PropensityError::ModelLoad(
            "onnx artifacts require the `onnx` feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const ARTIFACT: &str = r#"{
        "features": ["age"],
        "layers": [{"weights": [[0.05]], "bias": [-1.0], "activation": "sigmoid"}]
    }"#;

    fn config_for(dir: &Path) -> ModelConfig {
        ModelConfig {
            base_path: dir.to_path_buf(),
            file_name: "model.json".to_string(),
            format: ModelFormat::Dense,
            features: Vec::new(),
            eager_load: false,
        }
    }

    #[tokio::test]
    async fn loads_once_and_reuses_the_instance() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.json"), ARTIFACT).unwrap();
        let loader = ModelLoader::new(config_for(dir.path()));
        assert!(!loader.is_loaded());

        let first = loader.get_model().await.unwrap();
        // Removing the file must not matter once cached.
        std::fs::remove_file(dir.path().join("model.json")).unwrap();
        let second = loader.get_model().await.unwrap();

        assert!(loader.is_loaded());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.features(), ["age"]);
    }

    #[tokio::test]
    async fn missing_artifact_is_a_load_error_and_can_retry() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ModelLoader::new(config_for(dir.path()));

        let err = loader.get_model().await.unwrap_err();
        assert!(matches!(err, PropensityError::ModelLoad(_)));
        assert!(!loader.is_loaded());

        std::fs::write(dir.path().join("model.json"), ARTIFACT).unwrap();
        assert!(loader.get_model().await.is_ok());
    }

    #[tokio::test]
    async fn corrupt_artifact_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.json"), b"\x00garbage").unwrap();
        let loader = ModelLoader::new(config_for(dir.path()));

        assert!(matches!(
            loader.get_model().await,
            Err(PropensityError::ModelLoad(_))
        ));
    }

    fn onnx_config_for(dir: &Path) -> ModelConfig {
        ModelConfig {
            file_name: "model.onnx".to_string(),
            format: ModelFormat::Onnx,
            features: vec!["age".to_string()],
            ..config_for(dir)
        }
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn onnx_format_needs_the_onnx_feature() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.onnx"), b"graph").unwrap();

        match load_artifact(&onnx_config_for(dir.path())) {
            Err(PropensityError::ModelLoad(msg)) => assert!(msg.contains("onnx")),
            other => panic!("expected a load error, got {other:?}"),
        }
    }

    #[cfg(feature = "onnx")]
    #[test]
    fn corrupt_onnx_artifact_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.onnx"), b"\x00garbage").unwrap();

        assert!(matches!(
            load_artifact(&onnx_config_for(dir.path())),
            Err(PropensityError::ModelLoad(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_calls_share_one_artifact() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.json"), ARTIFACT).unwrap();
        let loader = Arc::new(ModelLoader::new(config_for(dir.path())));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let loader = Arc::clone(&loader);
                tokio::spawn(async move { loader.get_model().await.unwrap() })
            })
            .collect();

        let mut models = Vec::new();
        for handle in handles {
            models.push(handle.await.unwrap());
        }
        assert!(models.iter().all(|m| Arc::ptr_eq(m, &models[0])));
    }
}
