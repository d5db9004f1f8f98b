//! HTTP and WebSocket gateway for an embeddable JSON document store.
//!
//! The gateway exposes a [`store::DocumentStore`] over REST and a raw
//! WebSocket command protocol, enforces a shared-secret access policy and
//! streams query results with chunked transfer encoding.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;
pub mod store;
pub mod websocket;

pub use config::{GatewayConfig, HttpConfig};
pub use error::{init, GatewayError};
pub use lifecycle::{start, start_with_shutdown, LifecycleState, ServerHandle, Shutdown};
pub use store::{Document, DocumentStore, MemoryStore, StoreError};
