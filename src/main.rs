//! Prefix reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request                 ┌──────────────────────────────────────────┐
//!     GET /openai/v1/models ────────▶│ routing: strip prefix → /v1/models       │
//!                                    │ http::request: dispatch ─────────────────┼──▶ Upstream origin
//!                                    │ observability: histogram + counter       │
//!     Client Response ◀──────────────│ http::response: relay status/headers/body│◀── Upstream response
//!                                    └──────────────────────────────────────────┘
//!     GET /metrics ─────────────────▶ Prometheus text exposition
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use prefix_proxy::config::{self, ProxyConfig};
use prefix_proxy::lifecycle::{signals, Shutdown};
use prefix_proxy::observability::{logging, PrometheusTelemetry};
use prefix_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "prefix-proxy")]
#[command(about = "Reverse proxy for a single upstream API with per-path telemetry", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        config::validation::validate_config(&config).map_err(config::ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability.log_level);

    tracing::info!("prefix-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.upstream.origin,
        route_prefix = %config.upstream.route_prefix,
        fail_fast = config.upstream.fail_fast,
        "Configuration loaded"
    );

    let telemetry = Arc::new(PrometheusTelemetry::new()?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(signals::forward_signals(shutdown.clone()));
    telemetry.spawn_upkeep(
        Duration::from_secs(config.observability.upkeep_interval_secs),
        shutdown.subscribe(),
    );

    let server = HttpServer::new(config, telemetry, shutdown.clone())?;
    server.run(listener, server_shutdown).await?;

    if shutdown.is_failure() {
        tracing::error!("Exiting after upstream failure");
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
