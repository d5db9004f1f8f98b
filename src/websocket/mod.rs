//! WebSocket gateway.
//!
//! # Data Flow
//! ```text
//! GET / with Upgrade: websocket
//!     → upgrade() (path and protocol checks, access decided once)
//!     → session.rs (text frames only, one command per message)
//!     → command.rs (tokenize: set / add / del / patch / query)
//!     → DocumentStore, replies as text frames
//! ```
//!
//! # Design Decisions
//! - Malformed commands are dropped silently; the connection stays open
//! - A binary frame closes the connection
//! - Queries run once and end with a bare `<key>` frame

pub mod command;
pub mod session;

use axum::{
    body::Body,
    extract::{FromRequestParts, WebSocketUpgrade},
    http::{header, Request, StatusCode},
    response::Response,
};
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::http::{response, AppState};
use crate::store::DocumentStore;

pub use command::{Command, Op};
pub use session::WebSocketSession;

/// Upgrade protocol accepted at `/`.
pub const PROTOCOL: &str = "websocket";

/// Validate and perform a WebSocket upgrade.
pub async fn upgrade<S: DocumentStore>(state: AppState<S>, request: Request<Body>) -> Response {
    let (mut parts, _body) = request.into_parts();

    if parts.uri.path() != "/" {
        debug!(path = %parts.uri.path(), "Upgrade rejected: wrong path");
        return response::text(StatusCode::BAD_REQUEST, "WebSocket upgrade is only accepted at /");
    }
    let protocol_ok = parts
        .headers
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case(PROTOCOL));
    if !protocol_ok {
        debug!("Upgrade rejected: unsupported protocol");
        return response::text(StatusCode::BAD_REQUEST, "Unsupported upgrade protocol");
    }

    let access = match state.guard.check_upgrade(&parts.headers) {
        Ok(access) => access,
        Err(denial) => return response::denied(denial),
    };

    let ws = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(ws) => ws,
        Err(rejection) => {
            let err = GatewayError::WsUpgrade(rejection.body_text());
            warn!(code = err.code(), error = %err, "WebSocket handshake rejected");
            return response::text(StatusCode::BAD_REQUEST, err.to_string());
        }
    };

    let store = state.store.clone();
    let sessions = state.sessions.clone();
    let shutdown = state.shutdown.subscribe();
    let max_collection_len = state.config.max_collection_len;

    ws.max_message_size(state.config.max_body_size)
        .on_failed_upgrade(|e: axum::Error| {
            let err = GatewayError::WsUpgrade(e.to_string());
            warn!(code = err.code(), error = %err, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| async move {
            let guard = sessions.track();
            let session = WebSocketSession::new(guard.id(), store, access, max_collection_len);
            session.run(socket, shutdown).await;
        })
}
