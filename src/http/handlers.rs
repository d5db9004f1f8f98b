//! REST document handlers.
//!
//! Each handler re-asserts write access itself; the guard only decided
//! whether the request could run at all.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use tracing::debug;

use super::context::RequestContext;
use super::query;
use super::response;
use super::server::AppState;
use crate::routing::{self, Target, Verb};
use crate::store::{Document, DocumentStore};

/// Route, admit, read the body, then run the matching handler.
pub async fn dispatch<S: DocumentStore>(state: &AppState<S>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();

    let action = match routing::route(
        parts.method.as_str(),
        parts.uri.path(),
        state.config.max_collection_len,
    ) {
        Ok(action) => action,
        Err(e) => {
            debug!(method = %parts.method, path = %parts.uri.path(), error = %e, "Routing failed");
            return response::text(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let access = match state.guard.check_request(&parts.headers, &action) {
        Ok(access) => access,
        Err(denial) => {
            debug!(method = %parts.method, path = %parts.uri.path(), reason = %denial, "Request denied");
            return response::denied(denial);
        }
    };

    let body = match axum::body::to_bytes(body, state.config.max_body_size).await {
        Ok(body) => body,
        Err(e) => {
            debug!(error = %e, limit = state.config.max_body_size, "Request body rejected");
            return response::text(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
    };

    let ctx = RequestContext {
        action,
        access,
        headers: parts.headers,
        body,
    };
    if ctx.action.target == Target::Root {
        return query::run_query(Arc::clone(&state.store), &ctx).await;
    }
    handle(state.store.as_ref(), &ctx)
}

/// Run the document handler for an admitted request. Queries are served
/// by [`query::run_query`].
pub fn handle<S: DocumentStore>(store: &S, ctx: &RequestContext) -> Response {
    match (&ctx.action.verb, &ctx.action.target) {
        (Verb::Get, Target::Document { collection, id }) => get(store, collection, *id),
        (Verb::Head, Target::Document { collection, id }) => head(store, collection, *id),
        (Verb::Put, Target::Document { collection, id }) => put(store, ctx, collection, *id),
        (Verb::Patch, Target::Document { collection, id }) => patch(store, ctx, collection, *id),
        (Verb::Delete, Target::Document { collection, id }) => delete(store, ctx, collection, *id),
        (Verb::Post, Target::Collection(collection)) => create(store, ctx, collection),
        _ => response::text(StatusCode::BAD_REQUEST, "Unsupported request"),
    }
}

fn get<S: DocumentStore>(store: &S, collection: &str, id: i64) -> Response {
    let doc = match store.get(collection, id) {
        Ok(doc) => doc,
        Err(e) => return response::store_error(&e),
    };
    match doc.to_json(false) {
        Ok(bytes) => response::json(bytes),
        Err(e) => response::store_error(&e),
    }
}

fn head<S: DocumentStore>(store: &S, collection: &str, id: i64) -> Response {
    let length = store
        .get(collection, id)
        .and_then(|doc| doc.json_byte_count(false));
    match length {
        Ok(length) => response::json_length(length),
        Err(e) => response::store_error(&e),
    }
}

/// Parse the request body as a document; writes need a non-empty body.
fn body_document(ctx: &RequestContext) -> Result<Document, Response> {
    if ctx.body.is_empty() {
        return Err(response::text(StatusCode::BAD_REQUEST, "Request body required"));
    }
    Document::from_json(&ctx.body).map_err(|e| response::store_error(&e))
}

fn create<S: DocumentStore>(store: &S, ctx: &RequestContext, collection: &str) -> Response {
    if let Err(denial) = ctx.access.require_write() {
        return response::denied(denial);
    }
    let doc = match body_document(ctx) {
        Ok(doc) => doc,
        Err(response) => return response,
    };
    match store.put_new(collection, &doc) {
        Ok(id) => response::text(StatusCode::OK, id.to_string()),
        Err(e) => response::store_error(&e),
    }
}

fn put<S: DocumentStore>(store: &S, ctx: &RequestContext, collection: &str, id: i64) -> Response {
    if let Err(denial) = ctx.access.require_write() {
        return response::denied(denial);
    }
    let doc = match body_document(ctx) {
        Ok(doc) => doc,
        Err(response) => return response,
    };
    match store.put(collection, &doc, id) {
        Ok(()) => response::ok(),
        Err(e) => response::store_error(&e),
    }
}

fn patch<S: DocumentStore>(store: &S, ctx: &RequestContext, collection: &str, id: i64) -> Response {
    if let Err(denial) = ctx.access.require_write() {
        return response::denied(denial);
    }
    if ctx.body.is_empty() {
        return response::text(StatusCode::BAD_REQUEST, "Request body required");
    }
    let Ok(patch_text) = std::str::from_utf8(&ctx.body) else {
        return response::text(StatusCode::BAD_REQUEST, "Patch is not valid UTF-8");
    };
    match store.patch(collection, patch_text, id) {
        Ok(()) => response::ok(),
        Err(e) => response::store_error(&e),
    }
}

fn delete<S: DocumentStore>(store: &S, ctx: &RequestContext, collection: &str, id: i64) -> Response {
    if let Err(denial) = ctx.access.require_write() {
        return response::denied(denial);
    }
    match store.remove(collection, id) {
        Ok(()) => response::ok(),
        Err(e) => response::store_error(&e),
    }
}
