//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Routed request or WebSocket upgrade:
//!     → access_control.rs (token header vs configured secret)
//!     → Access::Privileged | Access::ReadOnly, or a Denial status
//!     → handlers re-check Access before every mutation
//! ```
//!
//! # Design Decisions
//! - Fail closed: a configured token is required unless anonymous reads
//!   are explicitly enabled, and then only for reads
//! - The decision for a WebSocket is taken once, at upgrade

pub mod access_control;

pub use access_control::{Access, AccessGuard, Denial, ACCESS_TOKEN_HEADER};
