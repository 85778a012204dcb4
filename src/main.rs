//! Petstore API forwarding proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request   ┌──────────┐   ┌────────────┐   ┌───────────┐
//!     ────────────────▶│  axum    │──▶│ CORS +     │──▶│ Forwarder │──▶ Upstream
//!                      │ listener │   │ access log │   │ + api_key │    (base URL)
//!     Client Response  └──────────┘   └────────────┘   └─────┬─────┘
//!     ◀──────────────────────── relayed status/headers/body ─┘
//!                               or 500 {"error":"Proxy error"}
//! ```

use clap::Parser;

use petstore_proxy::cli::Cli;
use petstore_proxy::lifecycle::{signals, startup, Shutdown};
use petstore_proxy::observability::{logging, metrics};
use petstore_proxy::HttpServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    logging::init(&config.observability)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let server = HttpServer::new(config)?;
    let listener = startup::bind(server.config()).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
