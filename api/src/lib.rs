//! Contact Form Reference Server
//!
//! Serves the form page and its configuration, and echoes submissions back
//! as a response document.
//!
//! # Routes
//!
//! ```text
//! ┌────────────────────┬──────────────────────────────────────────────┐
//! │ GET  /             │ form page, or the error page                 │
//! │ GET  /config.json  │ validated configuration                      │
//! │ POST /submit       │ urlencoded or multipart echo                 │
//! │ GET  /health       │ liveness                                     │
//! └────────────────────┴──────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod routes;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use contact_form::{ConfigLoader, ConfigSource, PageRenderer, SnapshotGenerator};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use models::*;

/// Largest accepted request body, uploads included
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024 * 1024;

/// Server state
pub struct ServerState {
    /// Fetches the configuration on every request
    pub loader: ConfigLoader,
    /// Where the configuration lives
    pub source: ConfigSource,
    renderer: PageRenderer,
    generator: SnapshotGenerator,
    body_limit: usize,
}

impl ServerState {
    /// State serving the configuration at `source`
    pub fn new(loader: ConfigLoader, source: ConfigSource) -> contact_form::Result<Self> {
        Ok(Self {
            loader,
            source,
            renderer: PageRenderer::new()?,
            generator: SnapshotGenerator::new()?,
            body_limit: DEFAULT_BODY_LIMIT,
        })
    }

    /// Cap request bodies at `bytes`; larger submissions get 413.
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }
}

/// Build the server router
pub fn build_router(state: ServerState) -> Router {
    let body_limit = state.body_limit;
    Router::new()
        .route("/", get(routes::page::index))
        .route("/config.json", get(routes::page::config))
        .route("/submit", post(routes::submit::submit))
        .route("/health", get(routes::health::health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind `addr` and serve until the process exits
pub async fn serve(addr: SocketAddr, state: ServerState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        source = %state.source.describe(),
        body_limit = state.body_limit,
        "listening"
    );
    axum::serve(listener, build_router(state)).await
}
