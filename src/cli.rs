use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::error::Result;
use crate::services::load_artifact;

#[derive(Parser, Debug)]
#[command(name = "propensity")]
#[command(version = "0.1.0")]
#[command(about = "Binary classification inference server for CSV payloads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config directory (default.toml, <PROPENSITY_ENV>.toml)
    #[arg(short, long, default_value = "config")]
    pub config: PathBuf,

    /// Interface to bind
    #[arg(long, env = "PROPENSITY_HOST")]
    pub host: Option<String>,

    /// Listen port
    #[arg(short, long, env = "PROPENSITY_PORT")]
    pub port: Option<u16>,

    /// Directory holding the model artifact
    #[arg(long, env = "PROPENSITY_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve /ping and /invocations (default)
    Serve,
    /// Load the model artifact once, print its features, and exit
    CheckModel,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.model_dir {
            config.model.base_path = dir.clone();
        }
    }
}

/// Load the configured artifact and print a summary.
pub fn check_model(config: &AppConfig) -> Result<()> {
    let path = config.model.artifact_path();
    let scorer = load_artifact(&config.model)?;

    println!("Model OK: {}", path.display());
    println!("Format:   {:?}", config.model.format);
    println!("Features ({}):", scorer.features().len());
    for name in scorer.features() {
        println!("  - {name}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let cli = Cli::parse_from([
            "propensity",
            "--port",
            "9000",
            "--model-dir",
            "/tmp/models",
            "check-model",
        ]);
        let mut config = AppConfig::default_config();
        cli.apply_overrides(&mut config);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.base_path, PathBuf::from("/tmp/models"));
        assert!(matches!(cli.command, Some(Commands::CheckModel)));
    }
}
