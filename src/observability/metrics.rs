//! Metrics collection and exposition.
//!
//! # Metrics
//! - `docgate_requests_total` (counter): REST requests by method, status
//! - `docgate_request_duration_seconds` (histogram): REST latency
//! - `docgate_ws_messages_total` (counter): WebSocket commands by verb
//! - `docgate_ws_dropped_total` (counter): malformed WebSocket messages
//! - `docgate_ws_sessions` (gauge): open WebSocket connections

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

/// Install the Prometheus recorder with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) -> bool {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            info!(address = %addr, "Metrics endpoint listening");
            true
        }
        Err(e) => {
            error!(address = %addr, error = %e, "Failed to install metrics exporter");
            false
        }
    }
}

pub fn record_request(method: &'static str, status: u16, elapsed: Duration) {
    counter!("docgate_requests_total", "method" => method, "status" => status.to_string())
        .increment(1);
    histogram!("docgate_request_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_ws_message(verb: &'static str) {
    counter!("docgate_ws_messages_total", "verb" => verb).increment(1);
}

pub fn record_ws_dropped() {
    counter!("docgate_ws_dropped_total").increment(1);
}

pub fn set_ws_sessions(count: usize) {
    gauge!("docgate_ws_sessions").set(count as f64);
}
