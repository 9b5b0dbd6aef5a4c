mod health;
mod mcp;
mod registry;
mod specs;

use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/mcp", post(mcp::handle))
        .route("/api/mcp/protocol", post(mcp::handle_protocol))
        .route("/v0.1/servers", get(registry::list_servers))
        .route(
            "/v0.1/servers/{server_name}/versions/{version}",
            get(registry::get_server_version),
        )
        .route("/api/openapi", get(specs::list_specs))
        .route("/api/openapi/{name}", get(specs::get_spec))
        .route("/health", get(health::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
