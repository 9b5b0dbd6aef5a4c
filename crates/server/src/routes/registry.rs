use crate::error::{ApiError, Result};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use mcp_bridge_registry::{ListServersQuery, ServerList};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListServersParams {
    limit: Option<String>,
    cursor: Option<String>,
    updated_since: Option<String>,
}

impl ListServersParams {
    /// Keeps the first value of each known key; repeats and unknown keys are ignored.
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "limit" => &mut params.limit,
                "cursor" => &mut params.cursor,
                "updated_since" => &mut params.updated_since,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

/// Leading integer of `raw` (`"25abc"` -> 25); negatives saturate to 0. Anything else is absent.
fn parse_limit(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    if negative {
        return Some(0);
    }
    Some(digits[..end].parse::<usize>().unwrap_or(usize::MAX))
}

/// GET /v0.1/servers
pub async fn list_servers(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ServerList>> {
    let params = ListServersParams::from_pairs(pairs);
    let query = ListServersQuery {
        limit: params.limit.as_deref().and_then(parse_limit),
        cursor: params.cursor.filter(|c| !c.is_empty()),
        updated_since: params.updated_since,
    };
    Ok(Json(state.registry.list_servers(&query).await?))
}

/// GET /v0.1/servers/{server_name}/versions/{version}; `version` may be `latest`.
pub async fn get_server_version(
    State(state): State<Arc<AppState>>,
    Path((server_name, version)): Path<(String, String)>,
) -> Result<Json<Value>> {
    state
        .registry
        .get_server_version(&server_name, &version)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Server or version not found".to_string()))
}
