//! Axum router for the relay's HTTP surface.
//!
//! Two routes: a health check and the inbound-message delivery callback
//! the transport layer posts to. Middleware: CORS and request tracing.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/inbound", post(handlers::inbound))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
