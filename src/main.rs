//! Embedded web server.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                    WEB SERVER                     │
//!                    │                                                   │
//!   Client Request   │  ┌─────────┐   ┌─────────┐   ┌──────────────┐     │
//!   ─────────────────┼─▶│   net   │──▶│  http   │──▶│   routing    │     │
//!                    │  │listener │   │ server  │   │ handler tree │     │
//!                    │  └─────────┘   └─────────┘   └──────┬───────┘     │
//!                    │                                     ▼             │
//!                    │        ┌────────┬───────────┬──────────────┐      │
//!                    │        │ denial │ redirect  │ resource │ servlet  │
//!                    │        └────────┴───────────┴──────────────┘      │
//!                    │                                                   │
//!                    │  ┌─────────────────────────────────────────────┐  │
//!                    │  │ config │ discovery │ lifecycle │ announce   │  │
//!                    │  └─────────────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use web_server::announce::LogAnnouncer;
use web_server::config::{load_config, WebServerConfig};
use web_server::lifecycle::{signals, ShutdownOutcome};
use web_server::observability::{logging, metrics};
use web_server::{LifecycleState, ShutdownManager, WebServer};

#[derive(Parser)]
#[command(name = "web-server")]
#[command(about = "Embedded web server", long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => WebServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    logging::init(&config.observability);
    tracing::info!("web-server v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.server.bind_address,
        port = config.server.port,
        max_workers = config.server.max_workers,
        contributions = config.contributions.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let shutdown_timeout = Duration::from_secs(config.shutdown.timeout_secs);
    let manager = Arc::new(ShutdownManager::from_config(&config.shutdown));
    let server = WebServer::builder(config)
        .shutdown_manager(Arc::clone(&manager))
        .announcer(Arc::new(LogAnnouncer))
        .build();

    server.start()?;
    if server.wait_until_settled().await == LifecycleState::Failed {
        return Err(format!("web server failed to start on port {}", server.port()).into());
    }

    signals::wait_for_signal().await;

    match manager.run(shutdown_timeout).await {
        ShutdownOutcome::Completed => tracing::info!("Shutdown complete"),
        outcome => tracing::warn!(outcome = ?outcome, "Shutdown did not complete cleanly"),
    }
    Ok(())
}
