use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Largest accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    6 * 1024 * 1024
}

/// Serialization format of the scoring artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// JSON dense network classifier
    Dense,
    /// ONNX graph (requires the `onnx` feature)
    Onnx,
}

impl Default for ModelFormat {
    fn default() -> Self {
        Self::Dense
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Directory holding the artifact (e.g. "/opt/ml/model")
    pub base_path: PathBuf,
    /// Artifact file name inside `base_path`
    pub file_name: String,
    #[serde(default)]
    pub format: ModelFormat,
    /// Feature columns in model input order. ONNX graphs carry no column
    /// names, so this is required for `onnx`.
    #[serde(default)]
    pub features: Vec<String>,
    /// Try to load the artifact at startup instead of on first request
    #[serde(default)]
    pub eager_load: bool,
}

impl ModelConfig {
    pub fn artifact_path(&self) -> PathBuf {
        self.base_path.join(&self.file_name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.max_body_bytes", default_max_body_bytes() as u64)?
            .set_default("model.base_path", "/opt/ml/model")?
            .set_default("model.file_name", "model.json")?
            .set_default("model.format", "dense")?
            .set_default("model.eager_load", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("PROPENSITY_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (PROPENSITY_MODEL__BASE_PATH, etc.)
            .add_source(
                Environment::with_prefix("PROPENSITY")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("model.features")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration used when no files or environment are present
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                max_body_bytes: default_max_body_bytes(),
            },
            model: ModelConfig {
                base_path: PathBuf::from("/opt/ml/model"),
                file_name: "model.json".to_string(),
                format: ModelFormat::Dense,
                features: Vec::new(),
                eager_load: false,
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be > 0".to_string());
        }

        if self.server.max_body_bytes == 0 {
            errors.push("server.max_body_bytes must be > 0".to_string());
        }

        if self.model.base_path.as_os_str().is_empty() {
            errors.push("model.base_path must not be empty".to_string());
        }

        if self.model.file_name.trim().is_empty() {
            errors.push("model.file_name must not be empty".to_string());
        }

        if self.model.format == ModelFormat::Onnx && self.model.features.is_empty() {
            errors.push("model.features must list the input columns for onnx models".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
