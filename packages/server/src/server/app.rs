//! Application setup and server configuration.

use std::time::Duration;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::routes::{
    analyze_call_handler, chat_handler, get_call_handler, get_document_handler, health_handler,
    list_calls_handler, regenerate_document_handler, seed_knowledge_handler,
    update_status_handler,
};

/// Model calls dominate request time; this bounds a stuck provider.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: ServerDeps,
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

/// Build the Axum application router
pub fn build_app(deps: ServerDeps, allowed_origins: &[String]) -> Router {
    let state = AppState { deps };

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/analyze-call", post(analyze_call_handler))
        .route("/api/v1/chat", post(chat_handler))
        .route("/api/v1/knowledge/seed", post(seed_knowledge_handler))
        .route("/api/v1/calls", get(list_calls_handler))
        .route("/api/v1/call/:call_id", get(get_call_handler))
        .route("/api/v1/call/:call_id/status", patch(update_status_handler))
        .route("/api/v1/call/:call_id/document", get(get_document_handler))
        .route(
            "/api/v1/call/:call_id/document/regenerate",
            post(regenerate_document_handler),
        )
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}
