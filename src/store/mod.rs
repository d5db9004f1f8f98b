//! Store collaborator contract.
//!
//! # Data Flow
//! ```text
//! REST handlers / streaming responder / WebSocket dispatch
//!     → DocumentStore (get, put, put_new, remove, patch)
//!     → DocumentStore::parse_query + execute(QueryVisitor)
//!     ← Document / StoreError
//! ```
//!
//! # Design Decisions
//! - The gateway never depends on a concrete store; `MemoryStore` is the
//!   reference implementation used by the binary and the tests
//! - Store calls are synchronous. Document calls run on the listener
//!   thread; `execute` runs on a blocking thread so results stream out
//!   while the store is still visiting
//! - The explain sink belongs to the visitor so the store can write the
//!   plan before the first visit without a second mutable borrow

pub mod document;
pub mod error;
pub mod memory;
pub mod patch;
pub mod query;

pub use document::Document;
pub use error::{ErrorKind, PatchError, StoreError};
pub use memory::MemoryStore;
pub use query::MemoryQuery;

/// A parsed query, as far as the gateway needs to know it.
pub trait QuerySpec {
    /// True if the query modifies data (e.g. carries an apply clause).
    fn is_mutating(&self) -> bool;

    /// Collection the query runs against, if it names one.
    fn collection(&self) -> Option<&str>;
}

/// Receives query results in store-defined order.
pub trait QueryVisitor {
    /// Buffer for a human-readable execution plan, `None` when not wanted.
    fn explain_sink(&mut self) -> Option<&mut String> {
        None
    }

    /// Called once per matched document. An error aborts execution.
    fn visit(&mut self, id: i64, doc: &Document) -> Result<(), StoreError>;
}

/// Capabilities the gateway consumes from the document store.
pub trait DocumentStore: Send + Sync + 'static {
    type Query: QuerySpec + Send + 'static;

    fn get(&self, collection: &str, id: i64) -> Result<Document, StoreError>;

    /// Store `doc` under `id`, replacing any existing document.
    fn put(&self, collection: &str, doc: &Document, id: i64) -> Result<(), StoreError>;

    /// Store `doc` under a newly assigned id.
    fn put_new(&self, collection: &str, doc: &Document) -> Result<i64, StoreError>;

    fn remove(&self, collection: &str, id: i64) -> Result<(), StoreError>;

    /// Apply an RFC 6902 or RFC 7396 patch given as JSON text.
    fn patch(&self, collection: &str, patch_json: &str, id: i64) -> Result<(), StoreError>;

    fn parse_query(&self, text: &str) -> Result<Self::Query, StoreError>;

    fn execute(&self, query: &Self::Query, visitor: &mut dyn QueryVisitor) -> Result<(), StoreError>;
}
