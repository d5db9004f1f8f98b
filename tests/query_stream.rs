//! Chunked query streaming against a real listener.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use docgate::http::query::{CHUNK_SIZE, EXPLAIN_DELIMITER};
use docgate::store::{Document, DocumentStore, MemoryQuery, MemoryStore, QueryVisitor, StoreError};

mod common;
use common::dechunk;

fn query_request(query: &str, hints: Option<&str>) -> String {
    let hints = hints.map(|h| format!("X-Hints: {h}\r\n")).unwrap_or_default();
    format!(
        "POST / HTTP/1.1\r\nHost: localhost\r\n{hints}Content-Length: {}\r\nConnection: close\r\n\r\n{query}",
        query.len()
    )
}

fn filled_store(docs: usize) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for n in 0..docs {
        let doc = Document::new(json!({"n": n, "pad": "x".repeat(100)}));
        store.put_new("c", &doc).unwrap();
    }
    store
}

#[tokio::test]
async fn results_are_framed_in_threshold_sized_chunks() {
    let handle = common::start(filled_store(200), common::http_config());
    let raw = common::raw_request(handle.local_addr(), &query_request("@c/*", None)).await;
    let response = dechunk(&raw);

    let head = response.head.to_ascii_lowercase();
    assert!(head.starts_with("http/1.1 200"), "{head}");
    assert!(head.contains("transfer-encoding: chunked"));
    assert!(head.contains("content-type: application/json"));
    assert!(response.terminated);
    assert!(response.chunks.len() > 1);
    let (last, full) = response.chunks.split_last().unwrap();
    assert!(full.iter().all(|chunk| chunk.len() >= CHUNK_SIZE));
    assert!(last.ends_with(b"\r\n"));

    let body = String::from_utf8(response.body()).unwrap();
    let mut lines = body.split("\r\n");
    assert_eq!(lines.next(), Some(""));
    let records: Vec<&str> = lines.filter(|line| !line.is_empty()).collect();
    assert_eq!(records.len(), 200);
    for (expected_id, record) in (1..).zip(&records) {
        let (id, json) = record.split_once('\t').unwrap();
        assert_eq!(id.parse::<i64>().unwrap(), expected_id);
        let value: Value = serde_json::from_str(json).unwrap();
        assert_eq!(value["n"], json!(expected_id - 1));
    }
}

#[tokio::test]
async fn explain_precedes_records_once() {
    let handle = common::start(filled_store(3), common::http_config());
    let raw = common::raw_request(handle.local_addr(), &query_request("@c/*", Some("explain"))).await;
    let body = String::from_utf8(dechunk(&raw).body()).unwrap();

    assert_eq!(body.matches(EXPLAIN_DELIMITER).count(), 1);
    let mut lines = body.split("\r\n");
    let preamble = lines.next().unwrap();
    assert!(preamble.starts_with("[COLLECTOR] scan @c"));
    assert!(preamble.ends_with(EXPLAIN_DELIMITER));
    let records: Vec<&str> = lines.filter(|line| !line.is_empty()).collect();
    assert_eq!(records.len(), 3);
    assert!(records[0].starts_with("1\t"));
}

#[tokio::test]
async fn reqwest_reads_the_stream() {
    let handle = common::start(filled_store(2), common::http_config());
    let url = format!("http://{}/", handle.local_addr());
    let response = reqwest::Client::new()
        .post(&url)
        .header("x-hints", "explain")
        .body("@c/[n = 1]")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.starts_with("[COLLECTOR] filter @c by n"));
    let last_record = format!("\r\n2\t{{\"n\":1,\"pad\":\"{}\"}}\r\n", "x".repeat(100));
    assert!(body.ends_with(&last_record), "{body}");
}

/// Store whose queries visit every document and then fail.
#[derive(Debug, Default)]
struct FailingStore {
    inner: MemoryStore,
}

impl DocumentStore for FailingStore {
    type Query = MemoryQuery;

    fn get(&self, collection: &str, id: i64) -> Result<Document, StoreError> {
        self.inner.get(collection, id)
    }

    fn put(&self, collection: &str, doc: &Document, id: i64) -> Result<(), StoreError> {
        self.inner.put(collection, doc, id)
    }

    fn put_new(&self, collection: &str, doc: &Document) -> Result<i64, StoreError> {
        self.inner.put_new(collection, doc)
    }

    fn remove(&self, collection: &str, id: i64) -> Result<(), StoreError> {
        self.inner.remove(collection, id)
    }

    fn patch(&self, collection: &str, patch_json: &str, id: i64) -> Result<(), StoreError> {
        self.inner.patch(collection, patch_json, id)
    }

    fn parse_query(&self, text: &str) -> Result<MemoryQuery, StoreError> {
        self.inner.parse_query(text)
    }

    fn execute(&self, query: &MemoryQuery, visitor: &mut dyn QueryVisitor) -> Result<(), StoreError> {
        self.inner.execute(query, visitor)?;
        Err(StoreError::Io("device lost".into()))
    }
}

fn failing_store(docs: usize) -> Arc<FailingStore> {
    let store = Arc::new(FailingStore::default());
    for n in 0..docs {
        store
            .put_new("c", &Document::new(json!({"n": n, "pad": "x".repeat(100)})))
            .unwrap();
    }
    store
}

#[tokio::test]
async fn failure_before_first_chunk_reports_500() {
    let handle = common::start(failing_store(2), common::http_config());
    let raw = common::raw_request(handle.local_addr(), &query_request("@c/*", None)).await;
    let text = String::from_utf8_lossy(&raw);
    assert!(text.starts_with("HTTP/1.1 500"), "{text}");
    assert!(text.ends_with("Internal server error"));
    assert!(!text.contains("device lost"));
}

#[tokio::test]
async fn failure_after_first_chunk_aborts_stream() {
    let handle = common::start(failing_store(200), common::http_config());
    let raw = common::raw_request(handle.local_addr(), &query_request("@c/*", None)).await;
    let response = dechunk(&raw);

    assert!(response.head.starts_with("HTTP/1.1 200"));
    assert!(!response.chunks.is_empty());
    assert!(!response.terminated);
}

/// Store that holds its query after the first visited document until the
/// test releases it.
#[derive(Debug)]
struct GatedStore {
    inner: MemoryStore,
    gate: Mutex<mpsc::Receiver<()>>,
    finished: AtomicBool,
}

struct HoldAfterFirst<'a> {
    visitor: &'a mut dyn QueryVisitor,
    gate: &'a Mutex<mpsc::Receiver<()>>,
    held: bool,
}

impl QueryVisitor for HoldAfterFirst<'_> {
    fn explain_sink(&mut self) -> Option<&mut String> {
        self.visitor.explain_sink()
    }

    fn visit(&mut self, id: i64, doc: &Document) -> Result<(), StoreError> {
        self.visitor.visit(id, doc)?;
        if !self.held {
            self.held = true;
            let _ = self.gate.lock().unwrap().recv_timeout(Duration::from_secs(10));
        }
        Ok(())
    }
}

impl DocumentStore for GatedStore {
    type Query = MemoryQuery;

    fn get(&self, collection: &str, id: i64) -> Result<Document, StoreError> {
        self.inner.get(collection, id)
    }

    fn put(&self, collection: &str, doc: &Document, id: i64) -> Result<(), StoreError> {
        self.inner.put(collection, doc, id)
    }

    fn put_new(&self, collection: &str, doc: &Document) -> Result<i64, StoreError> {
        self.inner.put_new(collection, doc)
    }

    fn remove(&self, collection: &str, id: i64) -> Result<(), StoreError> {
        self.inner.remove(collection, id)
    }

    fn patch(&self, collection: &str, patch_json: &str, id: i64) -> Result<(), StoreError> {
        self.inner.patch(collection, patch_json, id)
    }

    fn parse_query(&self, text: &str) -> Result<MemoryQuery, StoreError> {
        self.inner.parse_query(text)
    }

    fn execute(&self, query: &MemoryQuery, visitor: &mut dyn QueryVisitor) -> Result<(), StoreError> {
        let mut held = HoldAfterFirst {
            visitor,
            gate: &self.gate,
            held: false,
        };
        let result = self.inner.execute(query, &mut held);
        self.finished.store(true, Ordering::SeqCst);
        result
    }
}

#[tokio::test]
async fn first_chunk_arrives_while_query_is_still_running() {
    let (release, gate) = mpsc::channel();
    let store = Arc::new(GatedStore {
        inner: MemoryStore::new(),
        gate: Mutex::new(gate),
        finished: AtomicBool::new(false),
    });
    for n in 0..3 {
        let doc = Document::new(json!({"n": n, "pad": "x".repeat(CHUNK_SIZE + 1000)}));
        store.put_new("c", &doc).unwrap();
    }
    let handle = common::start(Arc::clone(&store), common::http_config());

    let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();
    stream.write_all(query_request("@c/*", None).as_bytes()).await.unwrap();
    let mut raw = common::read_until(&mut stream, b"\r\n1\t").await;
    assert!(raw.starts_with(b"HTTP/1.1 200"));
    assert!(!store.finished.load(Ordering::SeqCst));

    release.send(()).unwrap();
    stream.read_to_end(&mut raw).await.unwrap();
    assert!(store.finished.load(Ordering::SeqCst));

    let response = dechunk(&raw);
    assert!(response.terminated);
    let body = String::from_utf8(response.body()).unwrap();
    assert_eq!(body.split("\r\n").filter(|line| !line.is_empty()).count(), 3);
}
