//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! HttpConfig (bind, port)
//!     → listener.rs (bind TCP socket, report actual address)
//!     → axum::serve accept loop (lifecycle::handle)
//!     → connection.rs (WebSocket session ids and live count)
//! ```
//!
//! # Design Decisions
//! - Binding happens on the listener thread, inside its runtime, so a bind
//!   failure is reported back to `start` before it returns
//! - Each WebSocket session is tracked for logging and the sessions gauge

pub mod connection;
pub mod listener;
