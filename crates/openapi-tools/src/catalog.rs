//! Tool catalog service: `list` and `execute` over a caller-selected converter.
//!
//! Every call re-loads its spec source; nothing is cached between calls. The converter decides
//! which upstream shape is generated and how the base URL is derived. Execution itself only ever
//! sees the canonical [`ToolDefinition`].

use crate::error::{OpenApiToolsError, Result};
use crate::generator::{generate_rich, generate_simple};
use crate::normalize::UpstreamTools;
use crate::source::{self, LoadedSpec, SpecSource};
use async_trait::async_trait;
use mcp_bridge_http_tools::request::synthesize_with_mode;
use mcp_bridge_http_tools::{
    HttpExecutor, HttpMethod, ResultEnvelope, SynthesisMode, ToolDefinition, envelope,
};
use rmcp::model::{CallToolResult, Tool};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConverterKind {
    /// `mapper`-style tools; base URL falls back to the document's first server.
    #[default]
    #[serde(rename = "mcp-from-openapi")]
    Rich,
    /// `executionParameters`-style tools; base URL is only what the caller passes.
    #[serde(rename = "openapi-mcp-generator")]
    Simple,
}

impl ConverterKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConverterKind::Rich => "mcp-from-openapi",
            ConverterKind::Simple => "openapi-mcp-generator",
        }
    }
}

impl fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConverterKind {
    type Err = OpenApiToolsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mcp-from-openapi" | "variantA" | "rich" => Ok(ConverterKind::Rich),
            "openapi-mcp-generator" | "variantB" | "simple" => Ok(ConverterKind::Simple),
            other => Err(OpenApiToolsError::InvalidInput(format!(
                "Unknown converter \"{other}\". Use \"mcp-from-openapi\" or \"openapi-mcp-generator\""
            ))),
        }
    }
}

/// One source, loaded and normalized by a converter.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub upstream: UpstreamTools,
    pub tools: Vec<ToolDefinition>,
    /// Base URL echoed back by `list`.
    pub listed_base_url: Option<String>,
    /// Base URL requests are built against.
    pub execution_base_url: String,
    pub fingerprint: String,
}

impl LoadedCatalog {
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }
}

#[async_trait]
pub trait ToolConverter: Send + Sync {
    fn kind(&self) -> ConverterKind;

    /// Load `source`, generate this converter's upstream shape and normalize it.
    async fn load(&self, source: &SpecSource, base_url: Option<&str>) -> Result<LoadedCatalog>;
}

#[derive(Debug, Clone)]
pub struct RichConverter {
    executor: HttpExecutor,
}

impl RichConverter {
    #[must_use]
    pub fn new(executor: HttpExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolConverter for RichConverter {
    fn kind(&self) -> ConverterKind {
        ConverterKind::Rich
    }

    async fn load(&self, source: &SpecSource, base_url: Option<&str>) -> Result<LoadedCatalog> {
        let spec = source::load(source, &self.executor).await?;
        let upstream = UpstreamTools::Rich(generate_rich(&spec));
        let tools = upstream.normalize()?;
        let effective = non_empty(base_url)
            .map(str::to_string)
            .or_else(|| document_base_url(&spec))
            .unwrap_or_default();

        Ok(LoadedCatalog {
            upstream,
            tools,
            listed_base_url: Some(effective.clone()),
            execution_base_url: effective,
            fingerprint: spec.fingerprint,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SimpleConverter {
    executor: HttpExecutor,
}

impl SimpleConverter {
    #[must_use]
    pub fn new(executor: HttpExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ToolConverter for SimpleConverter {
    fn kind(&self) -> ConverterKind {
        ConverterKind::Simple
    }

    async fn load(&self, source: &SpecSource, base_url: Option<&str>) -> Result<LoadedCatalog> {
        let spec = source::load(source, &self.executor).await?;
        let upstream = UpstreamTools::Simple(generate_simple(&spec));
        let tools = upstream.normalize()?;

        Ok(LoadedCatalog {
            upstream,
            tools,
            listed_base_url: base_url.map(str::to_string),
            execution_base_url: base_url.unwrap_or_default().to_string(),
            fingerprint: spec.fingerprint,
        })
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// First declared server, with variables substituted by their defaults. Relative server URLs are
/// resolved against the URL the spec was fetched from.
fn document_base_url(spec: &LoadedSpec) -> Option<String> {
    let server = spec.document.servers.first()?;
    let mut url = server.url.clone();
    if let Some(vars) = &server.variables {
        for (name, var) in vars {
            url = url.replace(&format!("{{{name}}}"), &var.default);
        }
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        return Some(url);
    }
    match &spec.origin {
        Some(origin) => match origin.join(&url) {
            Ok(joined) => Some(joined.to_string()),
            Err(e) => {
                warn!(server = %url, error = %e, "cannot resolve relative server URL");
                Some(url)
            }
        },
        None => Some(url),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolListing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub converter: ConverterKind,
    pub tools: Vec<ListedTool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedTool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
    pub path: String,
    pub method: HttpMethod,
}

impl From<&ToolDefinition> for ListedTool {
    fn from(def: &ToolDefinition) -> Self {
        Self {
            name: def.name.clone(),
            description: def.description.clone(),
            input_schema: def.input_schema.clone(),
            path: def.path_template.clone(),
            method: def.http_method,
        }
    }
}

/// MCP `tools/list` result for a source.
#[derive(Debug, Clone, Serialize)]
pub struct McpToolList {
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogOptions {
    /// Where the debug snapshot of generated upstream tools is written, if anywhere.
    pub tools_dump: Option<PathBuf>,
    pub synthesis_mode: SynthesisMode,
}

#[derive(Debug, Clone)]
pub struct CatalogService {
    rich: RichConverter,
    simple: SimpleConverter,
    executor: HttpExecutor,
    options: CatalogOptions,
}

impl CatalogService {
    #[must_use]
    pub fn new(executor: HttpExecutor, options: CatalogOptions) -> Self {
        Self {
            rich: RichConverter::new(executor.clone()),
            simple: SimpleConverter::new(executor.clone()),
            executor,
            options,
        }
    }

    #[must_use]
    pub fn converter(&self, kind: ConverterKind) -> &dyn ToolConverter {
        match kind {
            ConverterKind::Rich => &self.rich,
            ConverterKind::Simple => &self.simple,
        }
    }

    async fn load(
        &self,
        source: &SpecSource,
        base_url: Option<&str>,
        kind: ConverterKind,
    ) -> Result<LoadedCatalog> {
        let catalog = self.converter(kind).load(source, base_url).await?;
        info!(
            converter = %kind,
            source = %source.describe(),
            fingerprint = %catalog.fingerprint,
            tools = catalog.tools.len(),
            "loaded tool catalog"
        );
        self.schedule_snapshot(kind, &catalog.upstream);
        Ok(catalog)
    }

    /// Fire-and-forget; a failed write is only logged.
    fn schedule_snapshot(&self, kind: ConverterKind, upstream: &UpstreamTools) {
        let snapshot = upstream.snapshot().to_string();
        debug!(converter = %kind, tools = %snapshot, "generated upstream tools");

        let Some(path) = self.options.tools_dump.clone() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = tokio::fs::write(&path, snapshot).await {
                warn!(path = %path.display(), error = %e, "failed to write tools snapshot");
            }
        });
    }

    /// List the tools of a source.
    ///
    /// # Errors
    ///
    /// Fails fast if the source cannot be loaded or normalized; no partial listing is returned.
    pub async fn list(
        &self,
        source: &SpecSource,
        base_url: Option<&str>,
        kind: ConverterKind,
    ) -> Result<ToolListing> {
        let catalog = self.load(source, base_url, kind).await?;
        Ok(ToolListing {
            base_url: catalog.listed_base_url,
            converter: kind,
            tools: catalog.tools.iter().map(ListedTool::from).collect(),
        })
    }

    /// Execute one tool of a source against its upstream API.
    ///
    /// An unknown tool name, a non-2xx upstream status and transport failures all come back as
    /// an envelope with `isError: true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be loaded, if strict synthesis rejects the input, or
    /// if a JSON response body cannot be decoded.
    pub async fn execute(
        &self,
        source: &SpecSource,
        base_url: Option<&str>,
        kind: ConverterKind,
        tool_name: &str,
        input: &Map<String, Value>,
        credential: Option<&str>,
    ) -> Result<ResultEnvelope> {
        let catalog = self.load(source, base_url, kind).await?;
        let Some(tool) = catalog.find(tool_name) else {
            info!(tool = %tool_name, converter = %kind, "tool not found");
            return Ok(ResultEnvelope::error(format!("Tool \"{tool_name}\" not found")));
        };

        let request = synthesize_with_mode(
            tool,
            &catalog.execution_base_url,
            input,
            credential,
            self.options.synthesis_mode,
        )?;

        match self.executor.execute(&request).await {
            Ok(raw) => {
                let result = envelope::normalize(&raw)?;
                debug!(tool = %tool_name, status = raw.status, is_error = result.is_error, "tool executed");
                Ok(result)
            }
            Err(e) if e.is_upstream_failure() => {
                warn!(tool = %tool_name, error = %e, "upstream call failed");
                Ok(ResultEnvelope::error(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// [`Self::list`] projected onto MCP tools with method-derived annotations.
    ///
    /// # Errors
    ///
    /// Same as [`Self::list`].
    pub async fn list_mcp_tools(
        &self,
        source: &SpecSource,
        base_url: Option<&str>,
        kind: ConverterKind,
    ) -> Result<McpToolList> {
        let catalog = self.load(source, base_url, kind).await?;
        Ok(McpToolList {
            tools: catalog.tools.iter().map(ToolDefinition::to_mcp_tool).collect(),
        })
    }

    /// [`Self::execute`] returned as an MCP `tools/call` result.
    ///
    /// # Errors
    ///
    /// Same as [`Self::execute`].
    pub async fn call_tool(
        &self,
        source: &SpecSource,
        base_url: Option<&str>,
        kind: ConverterKind,
        tool_name: &str,
        input: &Map<String, Value>,
        credential: Option<&str>,
    ) -> Result<CallToolResult> {
        self.execute(source, base_url, kind, tool_name, input, credential)
            .await
            .map(CallToolResult::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, StatusCode, Uri};
    use axum::routing::{any, get};
    use mcp_bridge_http_tools::OutboundPolicy;
    use serde_json::json;
    use std::time::Duration;
    use tokio::net::TcpListener;

    const SPEC: &str = r#"
openapi: "3.0.0"
info:
  title: pets
  version: "1"
servers:
  - url: /api
paths:
  /pets/{petId}:
    get:
      operationId: getPet
      parameters:
        - name: petId
          in: path
          required: true
          schema: { type: string }
        - name: verbose
          in: query
          schema: { type: boolean }
      responses:
        "200": { description: ok }
  /pets:
    post:
      operationId: createPet
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              properties:
                name: { type: string }
      responses:
        "201": { description: created }
  /missing:
    get:
      operationId: missing
      responses:
        "404": { description: nope }
  /motd:
    get:
      operationId: motd
      responses:
        "200": { description: ok }
"#;

    async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> axum::Json<Value> {
        axum::Json(json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query().unwrap_or(""),
            "authorization": headers.get("authorization").and_then(|v| v.to_str().ok()),
            "body": String::from_utf8_lossy(&body),
        }))
    }

    async fn spawn_upstream() -> (String, tokio::sync::oneshot::Sender<()>) {
        let app = Router::new()
            .route("/openapi.yaml", get(|| async { SPEC }))
            .route("/gone.yaml", get(|| async { StatusCode::GONE }))
            .route(
                "/api/missing",
                get(|| async { (StatusCode::NOT_FOUND, axum::Json(json!({"error": "nope"}))) }),
            )
            .route("/api/motd", get(|| async { "hello there" }))
            .route("/api/{*path}", any(echo));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        tokio::spawn(async move { server.await });
        (format!("http://{addr}"), shutdown_tx)
    }

    fn service(options: CatalogOptions) -> CatalogService {
        CatalogService::new(HttpExecutor::new(OutboundPolicy::permissive()).unwrap(), options)
    }

    fn spec_url(base: &str) -> SpecSource {
        SpecSource::from_request(None, Some(&format!("{base}/openapi.yaml"))).unwrap()
    }

    fn input(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn converter_ids_and_aliases() {
        assert_eq!("mcp-from-openapi".parse::<ConverterKind>().unwrap(), ConverterKind::Rich);
        assert_eq!("variantB".parse::<ConverterKind>().unwrap(), ConverterKind::Simple);
        let err = "swagger".parse::<ConverterKind>().unwrap_err();
        assert!(err.is_caller_error());
        assert_eq!(ConverterKind::default(), ConverterKind::Rich);
    }

    #[tokio::test]
    async fn rich_listing_resolves_relative_server_against_spec_url() {
        let (base, shutdown) = spawn_upstream().await;
        let svc = service(CatalogOptions::default());

        let listing = svc.list(&spec_url(&base), None, ConverterKind::Rich).await.unwrap();
        assert_eq!(listing.base_url.as_deref(), Some(format!("{base}/api").as_str()));
        let triples: Vec<(String, String, HttpMethod)> = listing
            .tools
            .iter()
            .map(|t| (t.name.clone(), t.path.clone(), t.method))
            .collect();
        assert_eq!(triples[0], ("getPet".to_string(), "/pets/{petId}".to_string(), HttpMethod::Get));
        assert_eq!(triples.len(), 4);

        let again = svc.list(&spec_url(&base), None, ConverterKind::Rich).await.unwrap();
        assert_eq!(listing, again);

        let v = serde_json::to_value(&listing).unwrap();
        assert_eq!(v["converter"], "mcp-from-openapi");
        assert_eq!(v["tools"][0]["method"], "GET");

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn simple_listing_echoes_caller_base_url_only() {
        let (base, shutdown) = spawn_upstream().await;
        let svc = service(CatalogOptions::default());

        let listing = svc.list(&spec_url(&base), None, ConverterKind::Simple).await.unwrap();
        assert_eq!(listing.base_url, None);
        assert!(serde_json::to_value(&listing).unwrap().get("baseUrl").is_none());

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn rich_execute_encodes_path_and_pretty_prints_json() {
        let (base, shutdown) = spawn_upstream().await;
        let svc = service(CatalogOptions::default());

        let result = svc
            .execute(
                &spec_url(&base),
                None,
                ConverterKind::Rich,
                "getPet",
                &input(json!({"petId": "a/b", "verbose": true})),
                Some("tok"),
            )
            .await
            .unwrap();

        assert!(!result.is_error);
        let text = result.first_text().unwrap();
        assert!(text.starts_with("{\n  \"method\": \"GET\""));
        let echoed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(echoed["path"], "/api/pets/a%2Fb");
        assert_eq!(echoed["query"], "verbose=true");
        assert_eq!(echoed["authorization"], "Bearer tok");

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn simple_execute_sends_whole_input_as_implicit_body() {
        let (base, shutdown) = spawn_upstream().await;
        let svc = service(CatalogOptions::default());
        let api = format!("{base}/api");

        let result = svc
            .execute(
                &spec_url(&base),
                Some(&api),
                ConverterKind::Simple,
                "createPet",
                &input(json!({"name": "rex"})),
                None,
            )
            .await
            .unwrap();

        let echoed: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
        assert_eq!(echoed["method"], "POST");
        assert_eq!(echoed["body"], r#"{"name":"rex"}"#);

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn execute_reports_upstream_and_resolution_failures_in_envelope() {
        let (base, shutdown) = spawn_upstream().await;
        let svc = service(CatalogOptions::default());
        let src = spec_url(&base);

        let missing = svc
            .execute(&src, None, ConverterKind::Rich, "nope", &Map::new(), None)
            .await
            .unwrap();
        assert!(missing.is_error);
        assert_eq!(missing.first_text(), Some("Tool \"nope\" not found"));

        let not_found = svc
            .execute(&src, None, ConverterKind::Rich, "missing", &Map::new(), None)
            .await
            .unwrap();
        assert!(not_found.is_error);
        assert_eq!(not_found.first_text(), Some("{\n  \"error\": \"nope\"\n}"));

        let text = svc
            .execute(&src, None, ConverterKind::Rich, "motd", &Map::new(), None)
            .await
            .unwrap();
        assert!(!text.is_error);
        assert_eq!(text.first_text(), Some("hello there"));

        let closed = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://127.0.0.1:{}", l.local_addr().unwrap().port())
        };
        let unreachable = svc
            .execute(&src, Some(&closed), ConverterKind::Rich, "motd", &Map::new(), None)
            .await
            .unwrap();
        assert!(unreachable.is_error);

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn mcp_projection_carries_annotations_and_call_results() {
        let (base, shutdown) = spawn_upstream().await;
        let svc = service(CatalogOptions::default());
        let src = spec_url(&base);

        let listed = svc.list_mcp_tools(&src, None, ConverterKind::Rich).await.unwrap();
        let v = serde_json::to_value(&listed).unwrap();
        let get_pet = v["tools"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["name"] == "getPet")
            .unwrap();
        assert_eq!(get_pet["annotations"]["readOnlyHint"], true);
        assert_eq!(get_pet["inputSchema"]["type"], "object");
        let create = v["tools"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["name"] == "createPet")
            .unwrap();
        assert_eq!(create["annotations"]["readOnlyHint"], false);

        let called = svc
            .call_tool(&src, None, ConverterKind::Rich, "motd", &Map::new(), None)
            .await
            .unwrap();
        assert_eq!(called.is_error, Some(false));
        let v = serde_json::to_value(&called).unwrap();
        assert_eq!(v["content"][0]["text"], "hello there");

        let missing = svc
            .call_tool(&src, None, ConverterKind::Rich, "nope", &Map::new(), None)
            .await
            .unwrap();
        assert_eq!(missing.is_error, Some(true));

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn strict_mode_rejects_missing_required_inputs() {
        let (base, shutdown) = spawn_upstream().await;
        let svc = service(CatalogOptions {
            synthesis_mode: SynthesisMode::Strict,
            ..CatalogOptions::default()
        });

        let err = svc
            .execute(&spec_url(&base), None, ConverterKind::Rich, "getPet", &Map::new(), None)
            .await
            .unwrap_err();
        assert!(err.is_caller_error());

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn failed_spec_fetch_fails_the_whole_call() {
        let (base, shutdown) = spawn_upstream().await;
        let svc = service(CatalogOptions::default());
        let src = SpecSource::from_request(None, Some(&format!("{base}/gone.yaml"))).unwrap();

        let err = svc.list(&src, None, ConverterKind::Rich).await.unwrap_err();
        assert!(matches!(err, OpenApiToolsError::OpenApiSpecFetch { .. }));
        assert!(!err.is_caller_error());

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn writes_tools_snapshot_in_background() {
        let (base, shutdown) = spawn_upstream().await;
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("tools-output.json");
        let svc = service(CatalogOptions {
            tools_dump: Some(dump.clone()),
            ..CatalogOptions::default()
        });

        svc.list(&spec_url(&base), None, ConverterKind::Simple).await.unwrap();

        let mut written = None;
        for _ in 0..50 {
            if let Ok(s) = tokio::fs::read_to_string(&dump).await
                && !s.is_empty()
            {
                written = Some(s);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let snapshot: Value = serde_json::from_str(&written.unwrap()).unwrap();
        assert_eq!(snapshot[0]["name"], "getPet");
        assert_eq!(snapshot[0]["path"], "/pets/{petId}");
        assert!(snapshot[0]["executionParameters"].is_array());

        let _ = shutdown.send(());
    }
}
