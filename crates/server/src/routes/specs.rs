use crate::error::{ApiError, Result};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct SpecLink {
    name: String,
    url: String,
}

#[derive(Debug, Serialize)]
pub struct SpecIndex {
    message: &'static str,
    specs: Vec<SpecLink>,
    usage: &'static str,
}

/// GET /api/openapi
pub async fn list_specs(State(state): State<Arc<AppState>>) -> Json<SpecIndex> {
    let specs = state
        .specs
        .allowed
        .iter()
        .map(|name| SpecLink {
            name: name.clone(),
            url: format!("/api/openapi/{name}"),
        })
        .collect();
    Json(SpecIndex {
        message: "Available OpenAPI specifications",
        specs,
        usage: "Access individual specs at /api/openapi/{name}",
    })
}

/// GET /api/openapi/{name}
pub async fn get_spec(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>> {
    if !state.specs.allowed.iter().any(|allowed| *allowed == name) {
        return Err(ApiError::NotFound(format!(
            "Invalid spec name. Available: {}",
            state.specs.allowed.join(", ")
        )));
    }

    let path = state.specs.dir.join(format!("{name}.json"));
    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to read {}: {e}", path.display())))?;
    let spec: Value = serde_json::from_str(&raw)
        .map_err(|e| ApiError::Internal(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Json(spec))
}
