use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use crate::api::{create_router, AppState};
use crate::config::AppConfig;
use crate::error::Result;
use crate::services::ModelLoader;

/// Start the inference server and block until Ctrl+C / SIGTERM.
pub async fn start_api_server(config: &AppConfig) -> Result<()> {
    let loader = Arc::new(ModelLoader::new(config.model.clone()));

    if config.model.eager_load {
        match loader.get_model().await {
            Ok(_) => info!("Model preloaded from {}", loader.artifact_path().display()),
            Err(e) => warn!("Model preload failed, will retry on first request: {}", e),
        }
    }

    let app = create_router(AppState::new(loader, config.server.max_body_bytes));

    let listener =
        TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    info!("Inference server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
