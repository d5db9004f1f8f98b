//! Per-request state.

use bytes::Bytes;
use axum::http::HeaderMap;

use crate::routing::Action;
use crate::security::Access;

/// Everything a handler needs about one routed, admitted request.
#[derive(Debug)]
pub struct RequestContext {
    pub action: Action,
    pub access: Access,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RequestContext {
    pub fn is_read_only(&self) -> bool {
        self.access.is_read_only()
    }
}
