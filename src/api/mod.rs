//! API module
//!
//! HTTP transport: routes, middleware, and the shared application state.

pub mod middleware;
pub mod routes;

pub use routes::create_router;

use std::sync::Arc;

use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::aggregation::AggregationEngine;
use crate::auth::TokenRegistry;
use crate::event_log::EventLog;
use crate::store::VisitStore;

/// Shared application state behind the router
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<VisitStore>,
    pub engine: Arc<AggregationEngine>,
    pub event_log: Option<Arc<EventLog>>,
    pub tokens: Arc<TokenRegistry>,
}

impl AppState {
    pub fn new(
        store: Arc<VisitStore>,
        engine: Arc<AggregationEngine>,
        event_log: Option<Arc<EventLog>>,
        tokens: Arc<TokenRegistry>,
    ) -> Self {
        Self {
            store,
            engine,
            event_log,
            tokens,
        }
    }
}

/// Build the full application router
///
/// Axum layers apply in reverse order (last added = first executed), so
/// requests flow logging -> auth -> handler.
pub fn app(state: AppState) -> Router {
    let protected = create_router()
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::logging_middleware));

    Router::new()
        // Health check (no auth)
        .route("/health", get(health_check))
        // Protected API routes
        .nest("/api/v1", protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
