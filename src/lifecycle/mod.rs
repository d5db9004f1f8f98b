//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (handle.rs):
//!     start(store, config)
//!     → spawn listener thread (or run on the caller's thread in blocking mode)
//!     → bind → report "serving" or the bind error over a rendezvous channel
//!     → ServerHandle returned in Running state
//!
//! Shutdown (shutdown.rs):
//!     ServerHandle::shutdown / Drop / signal
//!     → broadcast to the accept loop and every WebSocket session
//!     → drain connections → join listener thread
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger shutdown (blocking mode only)
//! ```
//!
//! # Design Decisions
//! - Lifecycle flag is a single atomic; every transition is a compare-and-swap
//! - Only the first shutdown caller does the work; later calls return at once
//! - The listener runs on one current-thread runtime, never a worker pool

pub mod handle;
pub mod shutdown;
pub mod signals;

pub use handle::{start, start_with_shutdown, LifecycleState, ServerHandle};
pub use shutdown::{Shutdown, ShutdownListener};
