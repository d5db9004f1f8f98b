//! Streaming query responder.
//!
//! # Protocol
//! ```text
//! POST /            body = query text, optional `X-Hints: explain`
//! 200 application/json, chunked:
//!     [<plan>--------------------]      once, if explain was requested
//!     \r\n<id>\t<json>                  per matched document
//!     \r\n                              end of results
//! ```
//!
//! # Data Flow
//! ```text
//! run_query (listener thread)
//!     → spawn_blocking: store.execute(ChunkedResponder)
//!         → every CHUNK_SIZE bytes: Frame::Data ─┐ bounded channel
//!         → Frame::End | Frame::Failed ──────────┤
//!     ← first frame decides the response         │
//!     ← response body pulls the rest ◀───────────┘
//! ```
//!
//! Until the first chunk exists nothing is committed, so a failure still
//! gets a proper error status. After that the status is fixed: a failure is
//! logged and the body is aborted, which drops the connection without the
//! terminating zero-length chunk. A client that goes away stops further
//! writes; the store call itself runs to completion.

use std::io;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::context::RequestContext;
use super::response;
use crate::error::{GatewayError, ERROR_SEND_RESPONSE};
use crate::security::Denial;
use crate::store::{Document, DocumentStore, QuerySpec, QueryVisitor, StoreError};

/// Buffered output size that triggers a chunk flush.
pub const CHUNK_SIZE: usize = 4096;

/// Separates the explain text from the first result line.
pub const EXPLAIN_DELIMITER: &str = "--------------------";

/// Comma-separated hints header.
pub const HINTS_HEADER: &str = "x-hints";

const EXPLAIN_HINT: &str = "explain";

/// Flushed chunks queued ahead of the socket before the store is held back.
const CHANNEL_DEPTH: usize = 4;

/// Parse the hints header. `Err` if the header is present more than once.
pub(crate) fn wants_explain(headers: &HeaderMap) -> Result<bool, ()> {
    let mut values = headers.get_all(HINTS_HEADER).iter();
    let Some(value) = values.next() else {
        return Ok(false);
    };
    if values.next().is_some() {
        return Err(());
    }
    let hints = String::from_utf8_lossy(value.as_bytes());
    Ok(hints.split(',').any(|hint| hint.trim() == EXPLAIN_HINT))
}

/// What the executing query hands to the response.
#[derive(Debug)]
enum Frame {
    Data(Bytes),
    End,
    Failed(StoreError),
}

/// Query visitor that frames results into HTTP chunks.
///
/// Runs on a blocking thread; `visit` waits for channel capacity, so at most
/// [`CHANNEL_DEPTH`] chunks plus the current buffer are held in memory.
#[derive(Debug)]
pub struct ChunkedResponder {
    buffer: Vec<u8>,
    explain: Option<String>,
    started: bool,
    chunks_sent: usize,
    tx: mpsc::Sender<Frame>,
    disconnected: bool,
}

impl ChunkedResponder {
    fn new(explain: bool, tx: mpsc::Sender<Frame>) -> Self {
        Self {
            buffer: Vec::new(),
            explain: explain.then(String::new),
            started: false,
            chunks_sent: 0,
            tx,
            disconnected: false,
        }
    }

    /// True once a chunk has been committed; the status can no longer change.
    pub fn data_sent(&self) -> bool {
        self.chunks_sent > 0
    }

    fn send(&mut self, frame: Frame) {
        if self.disconnected {
            return;
        }
        if self.tx.blocking_send(frame).is_err() {
            debug!(chunks_sent = self.chunks_sent, "Client went away, discarding query output");
            self.disconnected = true;
        }
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let chunk = Bytes::from(std::mem::take(&mut self.buffer));
        self.send(Frame::Data(chunk));
        self.chunks_sent += 1;
    }

    /// Report how execution ended: trailing line break and final flush on
    /// success, the error otherwise.
    fn complete(mut self, result: Result<(), StoreError>) {
        match result {
            Ok(()) => {
                if self.started {
                    self.buffer.extend_from_slice(b"\r\n");
                    self.flush();
                }
                self.send(Frame::End);
            }
            Err(e) => {
                if self.data_sent() {
                    let failure = GatewayError::SendResponse(e.to_string());
                    error!(
                        code = ERROR_SEND_RESPONSE,
                        error = %failure,
                        chunks_sent = self.chunks_sent,
                        "Query failed after response was committed, aborting stream"
                    );
                }
                self.send(Frame::Failed(e));
            }
        }
    }
}

impl QueryVisitor for ChunkedResponder {
    fn explain_sink(&mut self) -> Option<&mut String> {
        self.explain.as_mut()
    }

    fn visit(&mut self, id: i64, doc: &Document) -> Result<(), StoreError> {
        if self.disconnected {
            return Ok(());
        }
        if !self.started {
            self.started = true;
            if let Some(plan) = self.explain.take() {
                self.buffer.extend_from_slice(plan.as_bytes());
                self.buffer.extend_from_slice(EXPLAIN_DELIMITER.as_bytes());
            }
        }
        self.buffer.extend_from_slice(format!("\r\n{id}\t").as_bytes());
        doc.write_json(&mut self.buffer, false)?;
        if self.buffer.len() >= CHUNK_SIZE {
            self.flush();
        }
        Ok(())
    }
}

/// Committed response: the first chunk, then whatever the query still sends.
fn chunked(first: Bytes, rx: mpsc::Receiver<Frame>) -> Response {
    let rest = stream::unfold(Some(rx), |rx| async move {
        let mut rx = rx?;
        let failure = match rx.recv().await {
            Some(Frame::Data(chunk)) => return Some((Ok(chunk), Some(rx))),
            Some(Frame::End) => return None,
            Some(Frame::Failed(e)) => e.to_string(),
            None => {
                let failure = "query execution ended without completing".to_string();
                error!(code = ERROR_SEND_RESPONSE, error = %failure, "Aborting query stream");
                failure
            }
        };
        // Yield once so the chunks already written are flushed before the
        // body error drops the connection.
        tokio::task::yield_now().await;
        Some((Err(io::Error::other(GatewayError::SendResponse(failure))), None))
    });
    let frames = stream::once(async move { Ok::<Bytes, io::Error>(first) }).chain(rest);

    let mut response = Response::new(Body::from_stream(frames));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static(response::APPLICATION_JSON),
    );
    response
}

/// Handle `POST /`.
pub async fn run_query<S: DocumentStore>(store: Arc<S>, ctx: &RequestContext) -> Response {
    if ctx.body.is_empty() {
        return response::text(StatusCode::BAD_REQUEST, "Query required");
    }
    let Ok(text) = std::str::from_utf8(&ctx.body) else {
        return response::text(StatusCode::BAD_REQUEST, "Query is not valid UTF-8");
    };
    let query = match store.parse_query(text) {
        Ok(query) => query,
        Err(e) => return response::store_error(&e),
    };
    if ctx.is_read_only() && query.is_mutating() {
        return response::denied(Denial::ReadOnly);
    }
    let explain = match wants_explain(&ctx.headers) {
        Ok(explain) => explain,
        Err(()) => return response::text(StatusCode::BAD_REQUEST, "Multiple hints headers"),
    };
    debug!(collection = ?query.collection(), explain, "Executing query");

    let (tx, mut rx) = mpsc::channel(CHANNEL_DEPTH);
    tokio::task::spawn_blocking(move || {
        let mut responder = ChunkedResponder::new(explain, tx);
        let result = store.execute(&query, &mut responder);
        responder.complete(result);
    });

    match rx.recv().await {
        Some(Frame::Data(first)) => chunked(first, rx),
        Some(Frame::End) => response::ok(),
        Some(Frame::Failed(e)) => response::store_error(&e),
        None => response::store_error(&StoreError::Internal(
            "query execution ended without completing".into(),
        )),
    }
}
