//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use docgate::http::{router, AppState};
use docgate::store::{Document, DocumentStore, MemoryQuery, MemoryStore, QueryVisitor, StoreError};
use docgate::{HttpConfig, ServerHandle, Shutdown};

pub const TOKEN: &str = "s3cret-token";

/// MemoryStore wrapper counting every call that reaches the store.
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    calls: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl DocumentStore for RecordingStore {
    type Query = MemoryQuery;

    fn get(&self, collection: &str, id: i64) -> Result<Document, StoreError> {
        self.record();
        self.inner.get(collection, id)
    }

    fn put(&self, collection: &str, doc: &Document, id: i64) -> Result<(), StoreError> {
        self.record();
        self.inner.put(collection, doc, id)
    }

    fn put_new(&self, collection: &str, doc: &Document) -> Result<i64, StoreError> {
        self.record();
        self.inner.put_new(collection, doc)
    }

    fn remove(&self, collection: &str, id: i64) -> Result<(), StoreError> {
        self.record();
        self.inner.remove(collection, id)
    }

    fn patch(&self, collection: &str, patch_json: &str, id: i64) -> Result<(), StoreError> {
        self.record();
        self.inner.patch(collection, patch_json, id)
    }

    fn parse_query(&self, text: &str) -> Result<MemoryQuery, StoreError> {
        self.record();
        self.inner.parse_query(text)
    }

    fn execute(&self, query: &MemoryQuery, visitor: &mut dyn QueryVisitor) -> Result<(), StoreError> {
        self.record();
        self.inner.execute(query, visitor)
    }
}

/// Listener config on an ephemeral loopback port.
pub fn http_config() -> HttpConfig {
    HttpConfig {
        bind: "127.0.0.1".into(),
        port: 0,
        ..HttpConfig::default()
    }
}

pub fn token_config(read_anon: bool) -> HttpConfig {
    HttpConfig {
        access_token: Some(TOKEN.into()),
        read_anon,
        ..http_config()
    }
}

/// In-process router for `tower::ServiceExt::oneshot` tests.
pub fn app<S: DocumentStore>(store: Arc<S>, config: HttpConfig) -> Router {
    router(AppState::new(store, Arc::new(config), Shutdown::new()))
}

/// Start a real listener.
pub fn start<S: DocumentStore>(store: Arc<S>, config: HttpConfig) -> ServerHandle {
    docgate::init();
    docgate::start(store, config)
        .expect("gateway starts")
        .expect("http surface enabled")
}

/// Send a raw HTTP/1.1 request and read the full response until EOF.
pub async fn raw_request(addr: SocketAddr, request: &str) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    let _ = stream.read_to_end(&mut response).await;
    response
}

/// Read from `stream` until `needle` has arrived, failing after five seconds.
pub async fn read_until(stream: &mut TcpStream, needle: &[u8]) -> Vec<u8> {
    let mut received = Vec::new();
    let mut buf = [0u8; 8192];
    tokio::time::timeout(Duration::from_secs(5), async {
        while find(&received, needle).is_none() {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed after {} bytes", received.len());
            received.extend_from_slice(&buf[..n]);
        }
    })
    .await
    .expect("expected bytes arrive in time");
    received
}

/// Raw HTTP response split into head and decoded chunks.
#[derive(Debug)]
pub struct ChunkedResponse {
    pub head: String,
    pub chunks: Vec<Vec<u8>>,
    /// Whether the zero-length terminating chunk was received.
    pub terminated: bool,
}

impl ChunkedResponse {
    pub fn body(&self) -> Vec<u8> {
        self.chunks.concat()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Decode a chunked HTTP/1.1 response.
pub fn dechunk(raw: &[u8]) -> ChunkedResponse {
    let head_end = find(raw, b"\r\n\r\n").expect("response head");
    let head = String::from_utf8_lossy(&raw[..head_end]).into_owned();
    let mut rest = &raw[head_end + 4..];
    let mut chunks = Vec::new();
    let mut terminated = false;

    while let Some(line_end) = find(rest, b"\r\n") {
        let size_line = std::str::from_utf8(&rest[..line_end]).unwrap();
        let size_text = size_line.split(';').next().unwrap().trim();
        let size = usize::from_str_radix(size_text, 16).unwrap();
        rest = &rest[line_end + 2..];
        if size == 0 {
            terminated = true;
            break;
        }
        if rest.len() < size + 2 {
            break;
        }
        chunks.push(rest[..size].to_vec());
        rest = &rest[size + 2..];
    }
    ChunkedResponse { head, chunks, terminated }
}
