//! Store collaborator failures.

use thiserror::Error;

/// Classification used by the error translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    JsonParse,
    Patch,
    QueryParse,
    NoCollection,
    NotFound,
    Alloc,
    Io,
    Internal,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::JsonParse,
        ErrorKind::Patch,
        ErrorKind::QueryParse,
        ErrorKind::NoCollection,
        ErrorKind::NotFound,
        ErrorKind::Alloc,
        ErrorKind::Io,
        ErrorKind::Internal,
    ];
}

/// Semantic failures of RFC 6902 / RFC 7396 patches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("Invalid patch operation: {0}")]
    InvalidOp(String),

    #[error("Patch target does not exist: {0}")]
    TargetInvalid(String),

    #[error("Patch operation requires a value: {0}")]
    NoValue(String),

    #[error("Patch test failed at {0}")]
    TestFailed(String),

    #[error("Invalid array index in patch path: {0}")]
    InvalidArrayIndex(String),

    #[error("Invalid JSON pointer: {0}")]
    JsonPointer(String),
}

/// Error returned by every [`DocumentStore`](super::DocumentStore) operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Invalid JSON: {0}")]
    JsonParse(String),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("{0}")]
    QueryParse(String),

    #[error("Query collection not resolved: {0}")]
    NoCollection(String),

    #[error("Document not found")]
    NotFound,

    #[error("Allocation failure")]
    Alloc,

    #[error("I/O failure: {0}")]
    Io(String),

    #[error("{0}")]
    Internal(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::JsonParse(_) => ErrorKind::JsonParse,
            StoreError::Patch(_) => ErrorKind::Patch,
            StoreError::QueryParse(_) => ErrorKind::QueryParse,
            StoreError::NoCollection(_) => ErrorKind::NoCollection,
            StoreError::NotFound => ErrorKind::NotFound,
            StoreError::Alloc => ErrorKind::Alloc,
            StoreError::Io(_) => ErrorKind::Io,
            StoreError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            StoreError::Io(e.to_string())
        } else {
            StoreError::JsonParse(e.to_string())
        }
    }
}
