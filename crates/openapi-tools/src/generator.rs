//! Tool generators: `OpenAPI` operations -> upstream tool shapes.
//!
//! Discovery is shared. The two generators only differ in how they describe parameters and the
//! request body to the normalizer:
//! - [`generate_rich`] emits a `mapper` list and keeps the body as a single `body` input.
//! - [`generate_simple`] emits `executionParameters` and flattens object bodies into the inputs.

use crate::error::Result;
use crate::normalize::{
    RichMapperEntry, RichMetadata, RichTool, SimpleExecutionParameter, SimpleTool,
};
use crate::resolver::RefResolver;
use crate::source::LoadedSpec;
use mcp_bridge_http_tools::{HttpMethod, ParamLocation};
use openapiv3::{
    MediaType, Operation, Parameter, ParameterSchemaOrContent, PathItem, ReferenceOr,
    RequestBody, Response, StatusCode,
};
use regex::Regex;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use tracing::warn;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("static pattern"));

const MAX_TOOL_NAME_LEN: usize = 64;

#[derive(Debug, Clone)]
pub(crate) struct DiscoveredOperation {
    pub name: String,
    pub description: String,
    pub method: HttpMethod,
    pub path: String,
    pub operation_id: Option<String>,
    pub parameters: Vec<OperationParameter>,
    pub body: Option<OperationBody>,
    pub output_schema: Option<Value>,
}

#[derive(Debug, Clone)]
pub(crate) struct OperationParameter {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub schema: Value,
}

#[derive(Debug, Clone)]
pub(crate) struct OperationBody {
    pub content_type: String,
    pub schema: Value,
    pub required: bool,
}

/// Generate rich (`mapper`-style) tools for every operation in the document.
#[must_use]
pub fn generate_rich(spec: &LoadedSpec) -> Vec<RichTool> {
    discover(spec).into_iter().map(rich_tool).collect()
}

/// Generate simple (`executionParameters`-style) tools for every operation in the document.
#[must_use]
pub fn generate_simple(spec: &LoadedSpec) -> Vec<SimpleTool> {
    discover(spec).into_iter().map(simple_tool).collect()
}

pub(crate) fn discover(spec: &LoadedSpec) -> Vec<DiscoveredOperation> {
    let resolver = RefResolver::new(&spec.raw);
    let mut names: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for (path, item) in &spec.document.paths.paths {
        let item: PathItem = match resolver.resolve(item) {
            Ok(item) => item,
            Err(e) => {
                warn!(path = %path, error = %e, "skipping path");
                continue;
            }
        };

        for (method, op) in operations(&item) {
            match describe_operation(&resolver, path, method, &item.parameters, op) {
                Ok(mut described) => {
                    described.name = reserve_unique_tool_name(&mut names, &described.name);
                    out.push(described);
                }
                Err(e) => warn!(method = %method, path = %path, error = %e, "skipping operation"),
            }
        }
    }

    out
}

fn operations(item: &PathItem) -> Vec<(HttpMethod, &Operation)> {
    [
        (HttpMethod::Get, &item.get),
        (HttpMethod::Put, &item.put),
        (HttpMethod::Post, &item.post),
        (HttpMethod::Delete, &item.delete),
        (HttpMethod::Options, &item.options),
        (HttpMethod::Head, &item.head),
        (HttpMethod::Patch, &item.patch),
        (HttpMethod::Trace, &item.trace),
    ]
    .into_iter()
    .filter_map(|(method, op)| op.as_ref().map(|op| (method, op)))
    .collect()
}

fn describe_operation(
    resolver: &RefResolver<'_>,
    path: &str,
    method: HttpMethod,
    path_item_params: &[ReferenceOr<Parameter>],
    op: &Operation,
) -> Result<DiscoveredOperation> {
    let mut parameters = Vec::new();
    for param in merge_parameters(resolver, path_item_params, &op.parameters)? {
        let (location, data) = match &param {
            Parameter::Path { parameter_data, .. } => (ParamLocation::Path, parameter_data),
            Parameter::Query { parameter_data, .. } => (ParamLocation::Query, parameter_data),
            Parameter::Header { parameter_data, .. } => (ParamLocation::Header, parameter_data),
            Parameter::Cookie { parameter_data, .. } => {
                warn!(param = %parameter_data.name, path = %path, "cookie parameters are not supported");
                continue;
            }
        };

        let mut schema = parameter_schema(resolver, &data.format)?;
        if let Some(desc) = &data.description
            && let Some(obj) = schema.as_object_mut()
        {
            obj.insert("description".to_string(), Value::String(desc.clone()));
        }

        parameters.push(OperationParameter {
            name: data.name.clone(),
            location,
            required: data.required || location == ParamLocation::Path,
            schema,
        });
    }

    let body = match &op.request_body {
        Some(body) => request_body(resolver, body)?,
        None => None,
    };

    let name = op
        .operation_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| generate_canonical_name(method, path));

    let description = op
        .summary
        .clone()
        .or_else(|| op.description.clone())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("Calls {method} {path}"));

    Ok(DiscoveredOperation {
        name,
        description,
        method,
        path: path.to_string(),
        operation_id: op.operation_id.clone(),
        parameters,
        body,
        output_schema: output_schema(resolver, op),
    })
}

/// Path-item parameters first, then operation parameters; the operation wins on `(in, name)`.
fn merge_parameters(
    resolver: &RefResolver<'_>,
    path_item_params: &[ReferenceOr<Parameter>],
    operation_params: &[ReferenceOr<Parameter>],
) -> Result<Vec<Parameter>> {
    fn key_for(p: &Parameter) -> (&'static str, String) {
        match p {
            Parameter::Path { parameter_data, .. } => ("path", parameter_data.name.clone()),
            Parameter::Query { parameter_data, .. } => ("query", parameter_data.name.clone()),
            Parameter::Header { parameter_data, .. } => ("header", parameter_data.name.clone()),
            Parameter::Cookie { parameter_data, .. } => ("cookie", parameter_data.name.clone()),
        }
    }

    let mut merged: Vec<Parameter> = Vec::new();
    let mut index: HashMap<(&'static str, String), usize> = HashMap::new();

    for p in path_item_params.iter().chain(operation_params) {
        let resolved = resolver.resolve(p)?;
        let key = key_for(&resolved);
        if let Some(i) = index.get(&key).copied() {
            merged[i] = resolved;
        } else {
            index.insert(key, merged.len());
            merged.push(resolved);
        }
    }

    Ok(merged)
}

fn parameter_schema(resolver: &RefResolver<'_>, format: &ParameterSchemaOrContent) -> Result<Value> {
    match format {
        ParameterSchemaOrContent::Schema(schema) => {
            Ok(resolver.inline_schema(&serde_json::to_value(schema)?))
        }
        ParameterSchemaOrContent::Content(content) => Ok(content
            .values()
            .next()
            .map(|media| media_schema(resolver, media))
            .transpose()?
            .flatten()
            .unwrap_or_else(|| json!({"type": "string"}))),
    }
}

fn media_schema(resolver: &RefResolver<'_>, media: &MediaType) -> Result<Option<Value>> {
    match &media.schema {
        Some(schema) => Ok(Some(resolver.inline_schema(&serde_json::to_value(schema)?))),
        None => Ok(None),
    }
}

/// `application/json` if declared, otherwise the first declared content type.
fn request_body(
    resolver: &RefResolver<'_>,
    body: &ReferenceOr<RequestBody>,
) -> Result<Option<OperationBody>> {
    let body: RequestBody = resolver.resolve(body)?;
    let picked = body
        .content
        .get_key_value("application/json")
        .or_else(|| body.content.iter().next());
    let Some((content_type, media)) = picked else {
        return Ok(None);
    };

    let mut schema = media_schema(resolver, media)?.unwrap_or_else(|| json!({}));
    if let Some(desc) = &body.description
        && let Some(obj) = schema.as_object_mut()
        && !obj.contains_key("description")
    {
        obj.insert("description".to_string(), Value::String(desc.clone()));
    }

    Ok(Some(OperationBody {
        content_type: content_type.clone(),
        schema,
        required: body.required,
    }))
}

/// JSON schema of the first 2xx response that declares JSON content.
fn output_schema(resolver: &RefResolver<'_>, op: &Operation) -> Option<Value> {
    op.responses.responses.iter().find_map(|(status, response)| {
        let success = match status {
            StatusCode::Code(code) => (200..300).contains(code),
            StatusCode::Range(range) => *range == 2,
        };
        if !success {
            return None;
        }
        let response: Response = resolver.resolve(response).ok()?;
        response
            .content
            .iter()
            .find(|(ct, _)| ct.contains("json"))
            .and_then(|(_, media)| media_schema(resolver, media).ok().flatten())
    })
}

fn rich_tool(op: DiscoveredOperation) -> RichTool {
    let mut properties = Map::new();
    let mut required: Vec<String> = Vec::new();
    let mut mapper = Vec::new();

    for p in op.parameters {
        if p.required {
            required.push(p.name.clone());
        }
        properties.insert(p.name.clone(), p.schema);
        mapper.push(RichMapperEntry {
            input_key: p.name.clone(),
            location: p.location.as_str().to_string(),
            key: p.name,
            required: p.required,
        });
    }

    if let Some(body) = op.body {
        let input_key = unused_key(&properties, &["body", "requestBody"]);
        if body.required {
            required.push(input_key.clone());
        }
        properties.insert(input_key.clone(), body.schema);
        mapper.push(RichMapperEntry {
            input_key,
            location: ParamLocation::Body.as_str().to_string(),
            key: "body".to_string(),
            required: body.required,
        });
    }

    RichTool {
        name: op.name,
        description: Some(op.description),
        input_schema: object_schema(properties, required),
        output_schema: op.output_schema,
        mapper,
        metadata: RichMetadata {
            path: op.path,
            method: op.method.as_str().to_ascii_lowercase(),
            operation_id: op.operation_id,
        },
    }
}

fn simple_tool(op: DiscoveredOperation) -> SimpleTool {
    let mut properties = Map::new();
    let mut required: Vec<String> = Vec::new();
    let mut execution_parameters = Vec::new();

    for p in op.parameters {
        if p.required {
            required.push(p.name.clone());
        }
        properties.insert(p.name.clone(), p.schema);
        execution_parameters.push(SimpleExecutionParameter {
            name: p.name,
            location: p.location.as_str().to_string(),
        });
    }

    let mut request_body_content_type = None;
    if let Some(body) = op.body {
        let flattenable = body
            .schema
            .get("properties")
            .and_then(Value::as_object)
            .filter(|props| !props.is_empty());

        if let Some(props) = flattenable {
            let body_required: Vec<&str> = body
                .schema
                .get("required")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .collect();
            for (name, schema) in props {
                if properties.contains_key(name) {
                    continue;
                }
                if body.required && body_required.contains(&name.as_str()) {
                    required.push(name.clone());
                }
                properties.insert(name.clone(), schema.clone());
            }
        } else {
            let input_key = unused_key(&properties, &["requestBody", "body"]);
            if body.required {
                required.push(input_key.clone());
            }
            properties.insert(input_key.clone(), body.schema);
            execution_parameters.push(SimpleExecutionParameter {
                name: input_key,
                location: ParamLocation::Body.as_str().to_string(),
            });
        }
        request_body_content_type = Some(body.content_type);
    }

    SimpleTool {
        name: op.name,
        description: Some(op.description),
        input_schema: object_schema(properties, required),
        method: op.method.as_str().to_ascii_lowercase(),
        path_template: op.path,
        execution_parameters,
        request_body_content_type,
    }
}

fn object_schema(properties: Map<String, Value>, required: Vec<String>) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

fn unused_key(properties: &Map<String, Value>, candidates: &[&str]) -> String {
    candidates
        .iter()
        .find(|c| !properties.contains_key(**c))
        .map_or_else(|| format!("{}_", candidates[0]), |c| (*c).to_string())
}

fn generate_canonical_name(method: HttpMethod, path: &str) -> String {
    let raw = format!("{}_{}", method.as_str().to_ascii_lowercase(), path);
    let mut name = NON_ALNUM.replace_all(&raw, "_").trim_matches('_').to_string();
    name.truncate(MAX_TOOL_NAME_LEN);
    name
}

fn reserve_unique_tool_name(tool_names: &mut HashSet<String>, base: &str) -> String {
    if tool_names.insert(base.to_string()) {
        return base.to_string();
    }

    let mut counter = 1;
    loop {
        let candidate = format!("{base}_{counter}");
        if tool_names.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}
