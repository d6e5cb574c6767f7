//! Vitrine server
//!
//! Serves the session endpoints behind the gatekeeper.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use vitrine_api::{AppState, VitrineConfig, router};

/// Vitrine - storefront identity and session service
#[derive(Parser, Debug)]
#[command(name = "vitrine")]
#[command(about = "Storefront identity, session and edge authorization service", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true, env = "VITRINE_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vitrine=debug".into()),
        )
        .init();

    let args = Args::parse();
    let config = VitrineConfig::load(args.config.as_deref()).context("invalid configuration")?;

    match args.command {
        Command::Serve => serve(config).await,
        Command::CheckConfig => {
            println!(
                "Configuration OK: bind {}, gateway {:?}, credential store {:?}",
                config.server.bind, config.gateway.mode, config.credentials.store
            );
            Ok(())
        }
    }
}

async fn serve(config: VitrineConfig) -> Result<()> {
    let addr = config.bind_addr()?;
    let state = AppState::from_config(&config)
        .await
        .context("failed to initialize")?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Vitrine listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Vitrine stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
