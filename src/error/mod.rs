//! Gateway error codes and the store-error translation layer.
//!
//! # Data Flow
//! ```text
//! StoreError (collaborator failure)
//!     → translate.rs (ErrorKind → status + disclosure policy)
//!     → http/response.rs or websocket replies
//!
//! GatewayError (listener / send / upgrade failures)
//!     → code() + describe()
//!     → registry.rs (shared with the embedding system's error log)
//! ```
//!
//! # Design Decisions
//! - Gateway codes live in their own numeric range so they compose with the
//!   store's own codes in one registry
//! - `init()` is explicit and idempotent; nothing relies on static init order

pub mod registry;
pub mod translate;

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::config::ValidationError;

pub use translate::{translate, Disclosure, Translation};

/// Start of the numeric range reserved for gateway error codes.
pub const ERROR_START: u32 = 72000;
/// The HTTP listener could not bind its address.
pub const ERROR_HTTP_LISTEN: u32 = 72001;
/// Writing a response to the client failed.
pub const ERROR_SEND_RESPONSE: u32 = 72002;
/// Upgrading a connection to WebSocket failed.
pub const ERROR_WS_UPGRADE: u32 = 72003;
/// The listener thread or its runtime failed outside of binding.
pub const ERROR_LISTENER_RUNTIME: u32 = 72004;
/// The listener configuration was rejected before binding.
pub const ERROR_INVALID_CONFIG: u32 = 72005;
/// End (exclusive) of the gateway code range.
pub const ERROR_END: u32 = 72006;

/// Errors raised by the gateway itself, as opposed to the store.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to start HTTP network listener on {addr}: {source}")]
    ListenerBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error sending response: {0}")]
    SendResponse(String),

    #[error("Failed upgrading to websocket connection: {0}")]
    WsUpgrade(String),

    #[error("HTTP listener failure: {0}")]
    Listener(#[source] std::io::Error),

    #[error("Invalid HTTP configuration: {0}")]
    InvalidConfig(String),
}

impl GatewayError {
    /// Numeric code registered with the error-description registry.
    pub fn code(&self) -> u32 {
        match self {
            GatewayError::ListenerBind { .. } => ERROR_HTTP_LISTEN,
            GatewayError::SendResponse(_) => ERROR_SEND_RESPONSE,
            GatewayError::WsUpgrade(_) => ERROR_WS_UPGRADE,
            GatewayError::Listener(_) => ERROR_LISTENER_RUNTIME,
            GatewayError::InvalidConfig(_) => ERROR_INVALID_CONFIG,
        }
    }

    pub(crate) fn invalid_config(errors: &[ValidationError]) -> Self {
        let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
        GatewayError::InvalidConfig(reasons.join("; "))
    }
}

/// Human-readable description of a gateway error code.
///
/// Returns `None` for codes outside the gateway range so the registry can
/// fall through to other describers.
pub fn describe(code: u32) -> Option<&'static str> {
    if !(code > ERROR_START && code < ERROR_END) {
        return None;
    }
    match code {
        ERROR_HTTP_LISTEN => Some("Failed to start HTTP network listener (ERROR_HTTP_LISTEN)"),
        ERROR_SEND_RESPONSE => Some("Error sending response (ERROR_SEND_RESPONSE)"),
        ERROR_WS_UPGRADE => Some("Failed upgrading to websocket connection (ERROR_WS_UPGRADE)"),
        ERROR_LISTENER_RUNTIME => Some("HTTP listener thread failure (ERROR_LISTENER_RUNTIME)"),
        ERROR_INVALID_CONFIG => Some("Invalid HTTP listener configuration (ERROR_INVALID_CONFIG)"),
        _ => None,
    }
}

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// One-time process-wide initialization.
///
/// Registers [`describe`] with the error registry. Safe to call any number
/// of times from any thread; returns `true` only for the call that did the
/// work.
pub fn init() -> bool {
    if INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return false;
    }
    registry::register(describe);
    tracing::debug!("Gateway error codes registered");
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_in_range() {
        let err = GatewayError::SendResponse("broken pipe".into());
        assert_eq!(err.code(), ERROR_SEND_RESPONSE);
        assert!(describe(err.code()).is_some());
        assert!(describe(ERROR_START).is_none());
        assert!(describe(ERROR_END).is_none());
    }

    #[test]
    fn init_is_idempotent() {
        let first = init();
        let second = init();
        assert!(!second);
        // Another test may have won the race, but exactly one call did the work.
        let _ = first;
        assert_eq!(
            registry::explain(ERROR_WS_UPGRADE),
            Some("Failed upgrading to websocket connection (ERROR_WS_UPGRADE)")
        );
    }
}
