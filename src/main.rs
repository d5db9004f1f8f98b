//! docgate: serve an in-memory JSON document store over HTTP and WebSocket.
//!
//! ```text
//!     REST client ──┐                 ┌──────────────────────────────┐
//!                   ├── net listener ─▶ http / websocket → security   │
//!     WS client  ───┘                 │        ↓                     │
//!                                     │   DocumentStore (MemoryStore)│
//!                                     └──────────────────────────────┘
//! ```
//!
//! Runs in blocking mode on the main thread until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use docgate::config::{load_config, validate_config, GatewayConfig};
use docgate::observability::{logging, metrics};
use docgate::MemoryStore;

#[derive(Debug, Parser)]
#[command(name = "docgate", version, about = "HTTP and WebSocket gateway for a JSON document store")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Shared secret required in X-Access-Token
    #[arg(long)]
    token: Option<String>,

    /// Allow reads without a token
    #[arg(long)]
    read_anon: bool,
}

impl Cli {
    fn into_config(self) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => GatewayConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.http.bind = bind;
        }
        if let Some(port) = self.port {
            config.http.port = port;
        }
        if self.token.is_some() {
            config.http.access_token = self.token;
        }
        if self.read_anon {
            config.http.read_anon = true;
        }
        config.http.blocking = true;
        validate_config(&config).map_err(docgate::config::ConfigError::Validation)?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability);
    docgate::init();

    tracing::info!(
        bind = %config.http.bind,
        port = config.http.port,
        access_token = config.http.requires_token(),
        read_anon = config.http.read_anon,
        "docgate v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                metrics::init_metrics(addr);
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = Arc::new(MemoryStore::new());
    if let Err(e) = docgate::start(store, config.http) {
        tracing::error!(code = e.code(), error = %e, "Gateway failed");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
