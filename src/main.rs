//! Request-interception router.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────────┐
//!                         │                INTERCEPT ROUTER                    │
//!                         │                                                    │
//!   Client Request        │  ┌─────────┐    ┌──────────┐    ┌─────────────┐   │
//!   ──────────────────────┼─▶│  http   │───▶│  bridge  │───▶│   routing   │   │
//!                         │  │ server  │    │          │    │ route table │   │
//!                         │  └─────────┘    └────┬─────┘    └──────┬──────┘   │
//!                         │                      │ no match        │ match    │
//!                         │                      ▼                 ▼          │
//!                         │               ┌────────────┐    ┌─────────────┐   │
//!   Upstream  ◀───────────┼───────────────│  forward   │    │   handler   │   │
//!                         │               └────────────┘    └──────┬──────┘   │
//!                         │                                        │          │
//!                         │                                        ▼          │
//!                         │                                 ┌─────────────┐   │
//!                         │                                 │  kv store   │   │
//!                         │                                 │  (SQLite)   │   │
//!                         │                                 └─────────────┘   │
//!                         └───────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use intercept_router::config::{load_config, RouterConfig};
use intercept_router::lifecycle::{build_routes, signals, Shutdown};
use intercept_router::observability::{logging, metrics};
use intercept_router::{HttpServer, KvStore};

#[derive(Parser)]
#[command(name = "intercept-router")]
#[command(about = "Answers matching requests locally and forwards the rest", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Register the sample routes.
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if cli.demo {
        config.demo.enabled = true;
    }

    logging::init_logging(&config.observability);
    tracing::info!("intercept-router v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = ?config.upstream.address,
        store = %config.store.path.display(),
        handler_timeout_secs = config.timeouts.handler_secs,
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

    let store = KvStore::new(&config.store);
    let routes = Arc::new(build_routes(&config, &store)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config, routes)?;

    let server_task = tokio::spawn(server.run(listener, server_shutdown));

    signals::wait_for_signal().await;
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
