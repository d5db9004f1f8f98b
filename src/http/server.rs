//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum Router around a single fallback handler
//! - Hand WebSocket upgrades to the websocket module
//! - Wire up tracing middleware and request metrics

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    response::Response,
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::HttpConfig;
use crate::lifecycle::Shutdown;
use crate::net::connection::SessionTracker;
use crate::observability::metrics;
use crate::routing::Verb;
use crate::security::AccessGuard;
use crate::store::DocumentStore;
use crate::websocket;

/// Application state injected into handlers.
pub struct AppState<S> {
    pub store: Arc<S>,
    pub config: Arc<HttpConfig>,
    pub guard: AccessGuard,
    pub sessions: SessionTracker,
    pub shutdown: Shutdown,
}

// Manual impl: `S` itself need not be Clone.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            guard: self.guard.clone(),
            sessions: self.sessions.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<S: DocumentStore> AppState<S> {
    pub fn new(store: Arc<S>, config: Arc<HttpConfig>, shutdown: Shutdown) -> Self {
        Self {
            store,
            guard: AccessGuard::from_config(&config),
            config,
            sessions: SessionTracker::new(),
            shutdown,
        }
    }
}

/// Build the Axum router with all middleware layers.
pub fn router<S: DocumentStore>(state: AppState<S>) -> Router {
    Router::new()
        .fallback(gateway::<S>)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Entry point for every request.
async fn gateway<S: DocumentStore>(
    State(state): State<AppState<S>>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = Verb::parse(request.method().as_str()).map_or("OTHER", |verb| verb.as_str());

    let response = if request.headers().contains_key(header::UPGRADE) {
        websocket::upgrade(state, request).await
    } else {
        handlers::dispatch(&state, request).await
    };

    metrics::record_request(method, response.status().as_u16(), start.elapsed());
    response
}
