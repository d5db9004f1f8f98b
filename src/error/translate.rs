//! Store error → HTTP status translation.
//!
//! # Responsibilities
//! - Map every store error kind to a status code
//! - Decide what the client is allowed to see
//! - Log every server-side failure, whatever the client is shown
//!
//! # Design Decisions
//! - One static table, testable without a network layer
//! - Unknown kinds never reach this table: `ErrorKind` is exhaustive and
//!   unclassified collaborator failures arrive as `ErrorKind::Internal`

use axum::http::StatusCode;

use crate::store::{ErrorKind, StoreError};

/// Message shown to clients for any 5xx.
pub const GENERIC_SERVER_ERROR: &str = "Internal server error";

/// What part of a store error the client gets to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disclosure {
    /// The store's own diagnostic text.
    Diagnostic,
    /// A fixed generic message.
    Generic,
}

const TRANSLATIONS: &[(ErrorKind, StatusCode, Disclosure)] = &[
    (ErrorKind::JsonParse, StatusCode::BAD_REQUEST, Disclosure::Diagnostic),
    (ErrorKind::Patch, StatusCode::BAD_REQUEST, Disclosure::Diagnostic),
    (ErrorKind::QueryParse, StatusCode::BAD_REQUEST, Disclosure::Diagnostic),
    (ErrorKind::NoCollection, StatusCode::BAD_REQUEST, Disclosure::Diagnostic),
    (ErrorKind::NotFound, StatusCode::NOT_FOUND, Disclosure::Diagnostic),
    (ErrorKind::Alloc, StatusCode::INTERNAL_SERVER_ERROR, Disclosure::Generic),
    (ErrorKind::Io, StatusCode::INTERNAL_SERVER_ERROR, Disclosure::Generic),
    (ErrorKind::Internal, StatusCode::INTERNAL_SERVER_ERROR, Disclosure::Generic),
];

/// Result of translating a store error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub status: StatusCode,
    pub message: String,
}

/// Look up the table entry for an error kind.
pub fn policy(kind: ErrorKind) -> (StatusCode, Disclosure) {
    TRANSLATIONS
        .iter()
        .find(|(k, _, _)| *k == kind)
        .map(|(_, status, disclosure)| (*status, *disclosure))
        .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, Disclosure::Generic))
}

/// Translate a store error into the status and message a client receives.
pub fn translate(err: &StoreError) -> Translation {
    let kind = err.kind();
    let (status, disclosure) = policy(kind);
    if status.is_server_error() {
        tracing::error!(kind = ?kind, error = %err, "Store operation failed");
    } else {
        tracing::debug!(kind = ?kind, error = %err, status = status.as_u16(), "Store rejected request");
    }
    let message = match disclosure {
        Disclosure::Diagnostic => err.to_string(),
        Disclosure::Generic => GENERIC_SERVER_ERROR.to_string(),
    };
    Translation { status, message }
}
