#![allow(dead_code)]

use anyhow::Context as _;
use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::routing::{any, get};
use serde_json::{Value, json};
use std::path::Path;
use tokio::net::TcpListener;

pub use mcp_bridge_test_support::BridgeProcess;

pub const PETSTORE: &str = r#"{
  "openapi": "3.0.0",
  "info": {"title": "pets", "version": "1"},
  "servers": [{"url": "/api"}],
  "paths": {
    "/items/{id}": {
      "get": {
        "operationId": "getItem",
        "parameters": [
          {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}},
          {"name": "X-Trace", "in": "header", "schema": {"type": "string"}}
        ],
        "responses": {"200": {"description": "ok"}}
      }
    },
    "/items": {
      "post": {
        "operationId": "createItem",
        "requestBody": {
          "content": {
            "application/json": {
              "schema": {"type": "object", "properties": {"name": {"type": "string"}}}
            }
          }
        },
        "responses": {"201": {"description": "created"}}
      }
    },
    "/missing": {
      "get": {"operationId": "missing", "responses": {"404": {"description": "nope"}}}
    }
  }
}"#;

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> axum::Json<Value> {
    axum::Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query().unwrap_or(""),
        "authorization": headers.get("authorization").and_then(|v| v.to_str().ok()),
        "trace": headers.get("x-trace").and_then(|v| v.to_str().ok()),
        "body": String::from_utf8_lossy(&body),
    }))
}

/// Fake upstream API serving `PETSTORE` at `/openapi.json` and echoing everything under `/api`.
pub struct Upstream {
    pub base_url: String,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl Upstream {
    pub async fn start() -> anyhow::Result<Self> {
        let app = Router::new()
            .route(
                "/openapi.json",
                get(|| async { ([("content-type", "application/json")], PETSTORE) }),
            )
            .route(
                "/api/missing",
                get(|| async { (StatusCode::NOT_FOUND, axum::Json(json!({"error": "nope"}))) }),
            )
            .route("/api/{*path}", any(echo));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind upstream")?;
        let addr = listener.local_addr()?;
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = rx.await;
        });
        tokio::spawn(async move { server.await });

        Ok(Self {
            base_url: format!("http://{addr}"),
            shutdown: Some(tx),
        })
    }

    pub fn spec_url(&self) -> String {
        format!("{}/openapi.json", self.base_url)
    }
}

impl Drop for Upstream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn spawn_bridge(config: Option<&Path>) -> anyhow::Result<BridgeProcess> {
    let bin = env!("CARGO_BIN_EXE_mcp-bridge");
    let mut args: Vec<std::ffi::OsString> = Vec::new();
    if let Some(path) = config {
        args.push("--config".into());
        args.push(path.as_os_str().to_owned());
    }
    BridgeProcess::spawn(bin, args).await
}

pub async fn post_mcp(bridge: &BridgeProcess, body: Value) -> anyhow::Result<(StatusCode, Value)> {
    post_json(bridge, "/api/mcp", body).await
}

pub async fn post_json(
    bridge: &BridgeProcess,
    path: &str,
    body: Value,
) -> anyhow::Result<(StatusCode, Value)> {
    let resp = reqwest::Client::new()
        .post(bridge.url(path))
        .json(&body)
        .send()
        .await
        .with_context(|| format!("POST {path}"))?;
    let status = StatusCode::from_u16(resp.status().as_u16())?;
    let body = resp
        .json::<Value>()
        .await
        .with_context(|| format!("decode {path} response"))?;
    Ok((status, body))
}
