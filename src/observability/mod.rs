//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Listener, handlers, WebSocket sessions produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout subscriber installed by the binary
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing a subscriber or recorder is left to
//!   the embedding process
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
