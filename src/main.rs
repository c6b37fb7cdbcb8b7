//! On-Demand Backend Supervisor & Reverse Proxy
//!
//! A single-host supervisor built with Tokio and Axum. It owns one
//! backend child process and fronts it over HTTP.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────┐
//!                    │                 SUPERVISOR                     │
//!                    │                                                │
//!   /control/* ──────┼─▶ control plane ──▶ lifecycle controller       │
//!                    │                        │        │              │
//!                    │                        ▼        ▼              │
//!                    │                  child process  health         │
//!                    │                  (own group)    prober         │
//!                    │                        ▲                       │
//!                    │   inactivity timer ────┘                       │
//!                    │                                                │
//!   /proxy/* ────────┼─▶ reverse proxy ──▶ forward ──▶ backend HTTP   │
//!                    │      (503 when absent, resets the timer)       │
//!                    └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ondemand_proxy::config::{load_config, SupervisorConfig};
use ondemand_proxy::http::HttpServer;
use ondemand_proxy::lifecycle::signals;
use ondemand_proxy::observability;
use ondemand_proxy::supervisor::Supervisor;

#[derive(Parser, Debug)]
#[command(name = "ondemand-proxy", version, about = "Supervises a backend service and proxies HTTP traffic to it")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SupervisorConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    observability::logging::init_logging(&config.observability.log_level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ondemand-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend_address = %config.backend.address,
        backend_command = %config.backend.command,
        idle_timeout_ms = config.idle.timeout_ms,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    // The listener failing to bind is the one fatal startup fault.
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    let supervisor = Supervisor::new(config.clone());
    let server = HttpServer::new(&config, supervisor.clone());

    // A termination signal stops the backend (bounded by the graceful
    // timeout plus grace period) before the server is allowed to exit,
    // so the child is never orphaned.
    let shutdown = {
        let supervisor = supervisor.clone();
        async move {
            signals::shutdown_signal().await;
            tracing::info!("shutting down, stopping backend first");
            supervisor.request_stop().await;
        }
    };

    server.run(listener, shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
