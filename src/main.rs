use anyhow::{anyhow, Result};
use cinescan::config::{Cli, Config};
use cinescan::pipeline;
use cinescan::tmdb::{CatalogApi, TmdbClient};
use clap::Parser;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = dotenv();
    init_tracing();
    match loaded {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }

    let cli = Cli::parse();
    let config = Config::from_cli(cli)?;
    let catalog: Arc<dyn CatalogApi> = Arc::new(TmdbClient::new(config.catalog.clone())?);

    tokio::select! {
        res = pipeline::run(&config, catalog) => {
            let summary = res?;
            if !summary.is_complete() {
                warn!(
                    "{} of {} movies missing from {} ({} unmatched, {} failed fetches)",
                    summary.matched - summary.written,
                    summary.matched,
                    config.details_path().display(),
                    summary.search_failures,
                    summary.detail_failures
                );
            }
            Ok(())
        }
        _ = shutdown_signal() => {
            Err(anyhow!("Interrupted; output files may be incomplete"))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
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
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
