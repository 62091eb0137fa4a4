use clap::Parser;
use propensity::adapters::start_api_server;
use propensity::cli::{self, Cli, Commands};
use propensity::config::AppConfig;
use tracing::info;

mod main_runtime;

use main_runtime::{init_logging, init_logging_simple};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config)?;
    cli.apply_overrides(&mut config);
    if let Err(errors) = config.validate() {
        anyhow::bail!("invalid configuration:\n  {}", errors.join("\n  "));
    }

    match cli.command {
        Some(Commands::CheckModel) => {
            init_logging_simple();
            cli::check_model(&config)?;
        }
        Some(Commands::Serve) | None => {
            init_logging(&config.logging);
            info!(
                "Starting propensity server (model: {})",
                config.model.artifact_path().display()
            );
            start_api_server(&config).await?;
        }
    }

    Ok(())
}
