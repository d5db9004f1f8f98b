//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default upper bound on request bodies (64 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Default upper bound on collection name length.
pub const DEFAULT_MAX_COLLECTION_LEN: usize = 255;

/// Root configuration for the gateway binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP / WebSocket listener settings.
    pub http: HttpConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener settings read by `start`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    /// When false, `start` succeeds without opening a socket.
    pub enabled: bool,

    /// Interface address, IPv4 or IPv6 literal.
    pub bind: String,

    /// TCP port. 0 picks an ephemeral port.
    pub port: u16,

    /// Shared secret expected in `X-Access-Token`. `None` disables checks.
    pub access_token: Option<String>,

    /// Allow token-less reads when a token is configured.
    pub read_anon: bool,

    /// Largest accepted request body, in bytes.
    pub max_body_size: usize,

    /// Run the listener in the foreground until shutdown.
    pub blocking: bool,

    /// Longest collection name accepted in paths and commands.
    pub max_collection_len: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0".to_string(),
            port: 9191,
            access_token: None,
            read_anon: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            blocking: false,
            max_collection_len: DEFAULT_MAX_COLLECTION_LEN,
        }
    }
}

impl HttpConfig {
    /// `bind:port` in a form `TcpListener::bind` accepts.
    pub fn socket_addr(&self) -> String {
        let host = self.bind.trim_start_matches('[').trim_end_matches(']');
        if host.contains(':') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }

    /// True when a non-empty token is configured.
    pub fn requires_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9192".to_string(),
        }
    }
}
