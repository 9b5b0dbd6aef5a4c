//! Upstream tool shapes and their projection onto the canonical [`ToolDefinition`].
//!
//! The two generator shapes describe the same thing differently: rich tools carry a `mapper`
//! plus `metadata.{path,method}`, simple tools carry `executionParameters` plus `pathTemplate` and
//! `method` at the top level. Normalization is a pure projection; nothing here looks at the
//! `OpenAPI` document.

use crate::catalog::ConverterKind;
use crate::error::{OpenApiToolsError, Result};
use mcp_bridge_http_tools::{HttpMethod, ParamLocation, ParameterMapping, ToolDefinition};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    #[serde(default)]
    pub mapper: Vec<RichMapperEntry>,
    pub metadata: RichMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichMapperEntry {
    pub input_key: String,
    #[serde(rename = "type")]
    pub location: String,
    pub key: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichMetadata {
    pub path: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
    pub method: String,
    pub path_template: String,
    #[serde(default)]
    pub execution_parameters: Vec<SimpleExecutionParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body_content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleExecutionParameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
}

fn empty_object_schema() -> Value {
    json!({"type": "object"})
}

/// The upstream tool list produced by one generator, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamTools {
    Rich(Vec<RichTool>),
    Simple(Vec<SimpleTool>),
}

impl UpstreamTools {
    #[must_use]
    pub fn kind(&self) -> ConverterKind {
        match self {
            UpstreamTools::Rich(_) => ConverterKind::Rich,
            UpstreamTools::Simple(_) => ConverterKind::Simple,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            UpstreamTools::Rich(t) => t.len(),
            UpstreamTools::Simple(t) => t.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Project onto canonical definitions.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::ToolShape`] if any tool carries an unknown HTTP method.
    pub fn normalize(&self) -> Result<Vec<ToolDefinition>> {
        match self {
            UpstreamTools::Rich(tools) => normalize_rich(tools),
            UpstreamTools::Simple(tools) => normalize_simple(tools),
        }
    }

    /// Essential fields of every tool, in the layout written to the debug snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let items: Vec<Value> = match self {
            UpstreamTools::Rich(tools) => tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "inputSchema": t.input_schema,
                        "outputSchema": t.output_schema,
                        "mapper": t.mapper,
                        "path": t.metadata.path,
                        "method": t.metadata.method,
                    })
                })
                .collect(),
            UpstreamTools::Simple(tools) => tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "inputSchema": t.input_schema,
                        "path": t.path_template,
                        "method": t.method,
                        "executionParameters": t.execution_parameters,
                    })
                })
                .collect(),
        };
        Value::Array(items)
    }
}

/// Project rich tools: `mapper[i]` -> `{inputKey, location: type, targetKey: key}`.
///
/// # Errors
///
/// Returns an error if a tool's `metadata.method` is not a supported HTTP method.
pub fn normalize_rich(tools: &[RichTool]) -> Result<Vec<ToolDefinition>> {
    tools
        .iter()
        .map(|t| -> Result<ToolDefinition> {
            let parameter_mappings = t
                .mapper
                .iter()
                .filter_map(|m| mapping(&t.name, &m.input_key, &m.location, &m.key))
                .collect();
            Ok(ToolDefinition {
                name: t.name.clone(),
                description: t.description.clone(),
                http_method: method(&t.name, &t.metadata.method)?,
                path_template: t.metadata.path.clone(),
                parameter_mappings,
                input_schema: t.input_schema.clone(),
                request_body_content_type: None,
            })
        })
        .collect()
}

/// Project simple tools: `executionParameters[i]` -> `{inputKey: name, location: in, targetKey: name}`.
///
/// # Errors
///
/// Returns an error if a tool's `method` is not a supported HTTP method.
pub fn normalize_simple(tools: &[SimpleTool]) -> Result<Vec<ToolDefinition>> {
    tools
        .iter()
        .map(|t| -> Result<ToolDefinition> {
            let parameter_mappings = t
                .execution_parameters
                .iter()
                .filter_map(|p| mapping(&t.name, &p.name, &p.location, &p.name))
                .collect();
            Ok(ToolDefinition {
                name: t.name.clone(),
                description: t.description.clone(),
                http_method: method(&t.name, &t.method)?,
                path_template: t.path_template.clone(),
                parameter_mappings,
                input_schema: t.input_schema.clone(),
                request_body_content_type: t.request_body_content_type.clone(),
            })
        })
        .collect()
}

/// Normalize an opaque list of upstream tool objects in the given shape.
///
/// # Errors
///
/// Fails the whole call if any element does not deserialize as the expected shape.
pub fn normalize_upstream(kind: ConverterKind, tools: Vec<Value>) -> Result<Vec<ToolDefinition>> {
    let shape_err = |e: serde_json::Error| {
        OpenApiToolsError::ToolShape(format!("not a {} tool list: {e}", kind.as_str()))
    };
    let upstream = match kind {
        ConverterKind::Rich => UpstreamTools::Rich(
            serde_json::from_value(Value::Array(tools)).map_err(shape_err)?,
        ),
        ConverterKind::Simple => UpstreamTools::Simple(
            serde_json::from_value(Value::Array(tools)).map_err(shape_err)?,
        ),
    };
    upstream.normalize()
}

fn method(tool: &str, raw: &str) -> Result<HttpMethod> {
    raw.parse::<HttpMethod>()
        .map_err(|e| OpenApiToolsError::ToolShape(format!("tool '{tool}': {e}")))
}

/// Locations other than path/query/header/body are never applied at execution, so they are
/// dropped here.
fn mapping(tool: &str, input_key: &str, location: &str, target_key: &str) -> Option<ParameterMapping> {
    match location.parse::<ParamLocation>() {
        Ok(location) => Some(ParameterMapping::new(input_key, location, target_key)),
        Err(_) => {
            warn!(tool = %tool, param = %input_key, location = %location, "ignoring parameter mapping");
            None
        }
    }
}
