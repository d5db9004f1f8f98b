//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (axum::serve)
//!     → server.rs (single fallback handler, metrics, upgrade detection)
//!     → routing::route (method + path → Action, 400 on failure)
//!     → security::AccessGuard (401/400/403)
//!     → context.rs (RequestContext: action, access, headers, body)
//!     → handlers.rs (document CRUD) or query.rs (streamed query results)
//!     → response.rs (status + body, store errors through the translator)
//! ```
//!
//! # Design Decisions
//! - Routing is done by hand, not by axum's path router, so malformed
//!   paths and unsupported methods answer 400 rather than 404/405
//! - Every handler returns a `Response` on every path; buffers live in the
//!   handler's scope and drop on return

pub mod context;
pub mod handlers;
pub mod query;
pub mod response;
pub mod server;

pub use context::RequestContext;
pub use server::{router, AppState};
