//! `POST /api/mcp` and `POST /api/mcp/protocol`: list or execute the tools of an `OpenAPI` spec.

use crate::error::{ApiError, Result};
use crate::state::AppState;
use axum::{Json, body::Bytes, extract::State, response::IntoResponse, response::Response};
use mcp_bridge_openapi_tools::{ConverterKind, SpecSource};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct McpRequest {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    spec: Option<Value>,
    #[serde(default)]
    spec_url: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    input: Option<Value>,
    #[serde(default)]
    converter: Option<String>,
    #[serde(default)]
    auth_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    List,
    Execute,
}

fn parse_action(raw: Option<&str>) -> Result<Action> {
    match raw {
        Some("list") => Ok(Action::List),
        Some("execute") => Ok(Action::Execute),
        _ => Err(ApiError::BadRequest(
            "Invalid action. Use \"list\" or \"execute\"".to_string(),
        )),
    }
}

fn parse_input(input: Option<Value>) -> Result<Map<String, Value>> {
    match input {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(ApiError::BadRequest("input must be a JSON object".to_string())),
    }
}

/// A request body validated up to the point where the catalog takes over.
struct Prepared {
    source: SpecSource,
    converter: ConverterKind,
    base_url: Option<String>,
    call: Call,
}

enum Call {
    List,
    Execute {
        tool: String,
        input: Map<String, Value>,
        credential: Option<String>,
    },
}

fn prepare(body: &[u8]) -> Result<Prepared> {
    let req: McpRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?;

    let source = SpecSource::from_request(req.spec.as_ref(), req.spec_url.as_deref())?;
    let converter = match req.converter.as_deref() {
        None | Some("") => ConverterKind::default(),
        Some(raw) => raw.parse::<ConverterKind>()?,
    };
    let call = match parse_action(req.action.as_deref())? {
        Action::List => Call::List,
        Action::Execute => {
            let tool = req
                .tool
                .filter(|t| !t.is_empty())
                .ok_or_else(|| ApiError::BadRequest("Tool name required".to_string()))?;
            Call::Execute {
                tool,
                input: parse_input(req.input)?,
                credential: req.auth_token.filter(|t| !t.is_empty()),
            }
        }
    };

    Ok(Prepared {
        source,
        converter,
        base_url: req.base_url,
        call,
    })
}

pub async fn handle(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    let Prepared {
        source,
        converter,
        base_url,
        call,
    } = prepare(&body)?;
    let base_url = base_url.as_deref();

    match call {
        Call::List => {
            let listing = state.catalog.list(&source, base_url, converter).await?;
            Ok(Json(listing).into_response())
        }
        Call::Execute {
            tool,
            input,
            credential,
        } => {
            let result = state
                .catalog
                .execute(&source, base_url, converter, &tool, &input, credential.as_deref())
                .await?;
            Ok(Json(result).into_response())
        }
    }
}

/// `POST /api/mcp/protocol`: same body as `/api/mcp`, answered with MCP `tools/list` and
/// `tools/call` result objects.
pub async fn handle_protocol(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response> {
    let Prepared {
        source,
        converter,
        base_url,
        call,
    } = prepare(&body)?;
    let base_url = base_url.as_deref();

    match call {
        Call::List => {
            let tools = state
                .catalog
                .list_mcp_tools(&source, base_url, converter)
                .await?;
            Ok(Json(tools).into_response())
        }
        Call::Execute {
            tool,
            input,
            credential,
        } => {
            let result = state
                .catalog
                .call_tool(&source, base_url, converter, &tool, &input, credential.as_deref())
                .await?;
            Ok(Json(result).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn actions_and_inputs() {
        assert_eq!(parse_action(Some("list")).unwrap(), Action::List);
        assert_eq!(parse_action(Some("execute")).unwrap(), Action::Execute);
        assert!(matches!(parse_action(Some("delete")), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_action(None), Err(ApiError::BadRequest(_))));

        assert!(parse_input(None).unwrap().is_empty());
        assert!(parse_input(Some(Value::Null)).unwrap().is_empty());
        assert_eq!(parse_input(Some(json!({"a": 1}))).unwrap()["a"], 1);
        assert!(parse_input(Some(json!([1, 2]))).is_err());
    }

    #[test]
    fn request_fields_are_camel_case() {
        let req: McpRequest = serde_json::from_value(json!({
            "action": "execute",
            "specUrl": "http://localhost/spec.json",
            "baseUrl": "http://localhost/api",
            "authToken": "t",
            "extra": true
        }))
        .unwrap();
        assert_eq!(req.spec_url.as_deref(), Some("http://localhost/spec.json"));
        assert_eq!(req.base_url.as_deref(), Some("http://localhost/api"));
        assert_eq!(req.auth_token.as_deref(), Some("t"));
        assert!(req.input.is_none());
    }

    #[test]
    fn prepare_validates_before_any_upstream_work() {
        let err = prepare(br#"{"action":"execute","specUrl":"http://localhost/s.json"}"#)
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::BadRequest(m) if m == "Tool name required"));

        let prepared = prepare(
            br#"{"action":"execute","specUrl":"http://localhost/s.json","tool":"t","authToken":""}"#,
        )
        .unwrap();
        match prepared.call {
            Call::Execute {
                tool, credential, ..
            } => {
                assert_eq!(tool, "t");
                assert!(credential.is_none());
            }
            Call::List => panic!("expected execute"),
        }
        assert_eq!(prepared.converter, ConverterKind::Rich);
    }
}
