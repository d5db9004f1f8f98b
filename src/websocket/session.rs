//! Per-connection WebSocket session.

use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use tracing::{debug, warn};

use super::command::{self, Command, Op};
use crate::error::{translate, GatewayError};
use crate::lifecycle::ShutdownListener;
use crate::net::connection::SessionId;
use crate::observability::metrics;
use crate::security::{Access, Denial};
use crate::store::{Document, DocumentStore, QuerySpec, QueryVisitor, StoreError};

/// State of one upgraded connection. Access is fixed at upgrade time.
pub struct WebSocketSession<S> {
    id: SessionId,
    store: Arc<S>,
    access: Access,
    max_collection_len: usize,
}

/// Collects one `<key>\t<id>\t<json>` frame per query result.
struct ResultFrames<'k> {
    key: &'k str,
    frames: Vec<String>,
}

impl QueryVisitor for ResultFrames<'_> {
    fn visit(&mut self, id: i64, doc: &Document) -> Result<(), StoreError> {
        let json = String::from_utf8(doc.to_json(false)?)
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        self.frames.push(format!("{}\t{}\t{}", self.key, id, json));
        Ok(())
    }
}

fn error_reply(key: &str, err: &StoreError) -> String {
    format!("{} ERROR: {}", key, translate(err).message)
}

fn denied_reply(key: &str) -> String {
    format!("{} ERROR: {}", key, Denial::ReadOnly)
}

impl<S: DocumentStore> WebSocketSession<S> {
    pub fn new(id: SessionId, store: Arc<S>, access: Access, max_collection_len: usize) -> Self {
        Self {
            id,
            store,
            access,
            max_collection_len,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Handle one text message and return the frames to send back.
    /// Malformed messages yield no frames.
    pub fn handle_text(&self, message: &str) -> Vec<String> {
        let Some(Command { key, op }) = command::parse(message, self.max_collection_len) else {
            debug!(session_id = %self.id, "Dropping malformed WebSocket message");
            metrics::record_ws_dropped();
            return Vec::new();
        };
        metrics::record_ws_message(op.verb());

        if op.is_write() && self.access.is_read_only() {
            return vec![denied_reply(key)];
        }

        let store = self.store.as_ref();
        let result = match op {
            Op::Set { collection, id, payload } => Document::from_json(payload.as_bytes())
                .and_then(|doc| store.put(collection, &doc, id))
                .map(|()| id),
            Op::Add { collection, payload } => Document::from_json(payload.as_bytes())
                .and_then(|doc| store.put_new(collection, &doc)),
            Op::Del { collection, id } => store.remove(collection, id).map(|()| id),
            Op::Patch { collection, id, payload } => {
                store.patch(collection, payload, id).map(|()| id)
            }
            Op::Query(text) => return self.query(key, text),
        };
        match result {
            Ok(id) => vec![format!("{key}\t{id}")],
            Err(e) => vec![error_reply(key, &e)],
        }
    }

    /// One-shot query: a frame per result, then the bare key.
    fn query(&self, key: &str, text: &str) -> Vec<String> {
        let query = match self.store.parse_query(text) {
            Ok(query) => query,
            Err(e) => return vec![error_reply(key, &e)],
        };
        if query.is_mutating() && self.access.is_read_only() {
            return vec![denied_reply(key)];
        }
        let mut results = ResultFrames { key, frames: Vec::new() };
        let outcome = self.store.execute(&query, &mut results);
        let mut frames = results.frames;
        match outcome {
            Ok(()) => frames.push(key.to_string()),
            Err(e) => frames.push(error_reply(key, &e)),
        }
        frames
    }

    /// Serve the connection until the client leaves or shutdown is signalled.
    pub async fn run(self, mut socket: WebSocket, mut shutdown: ShutdownListener) {
        debug!(session_id = %self.id, read_only = self.access.is_read_only(), "WebSocket session opened");
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    let frame = CloseFrame {
                        code: close_code::AWAY,
                        reason: "server shutting down".into(),
                    };
                    let _ = socket.send(Message::Close(Some(frame))).await;
                    break;
                }
                message = socket.recv() => {
                    let message = match message {
                        Some(Ok(message)) => message,
                        Some(Err(e)) => {
                            debug!(session_id = %self.id, error = %e, "WebSocket receive failed");
                            break;
                        }
                        None => break,
                    };
                    match message {
                        Message::Text(text) => {
                            for reply in self.handle_text(text.as_str()) {
                                if let Err(e) = socket.send(Message::Text(reply.into())).await {
                                    let err = GatewayError::SendResponse(e.to_string());
                                    warn!(session_id = %self.id, code = err.code(), error = %err, "WebSocket send failed");
                                    return;
                                }
                            }
                        }
                        Message::Binary(_) => {
                            debug!(session_id = %self.id, "Binary frame received, closing");
                            let frame = CloseFrame {
                                code: close_code::UNSUPPORTED,
                                reason: "binary frames are not supported".into(),
                            };
                            let _ = socket.send(Message::Close(Some(frame))).await;
                            break;
                        }
                        // Pings are answered by the protocol layer.
                        Message::Ping(_) | Message::Pong(_) => {}
                        Message::Close(_) => break,
                    }
                }
            }
        }
    }
}
