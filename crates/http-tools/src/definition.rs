//! Canonical tool definition shared by every generator variant.
//!
//! A [`ToolDefinition`] is produced once per listing call and never mutated afterwards. Both
//! upstream generator shapes are projected into this form before anything is executed.

use crate::error::{HttpToolsError, Result};
use crate::semantics::annotations_for_method;
use rmcp::model::{JsonObject, Tool};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// Every supported method, in the order operations are discovered on a path item.
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
        HttpMethod::Trace,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }

    #[must_use]
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Trace => reqwest::Method::TRACE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = HttpToolsError;

    fn from_str(s: &str) -> Result<Self> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| HttpToolsError::Config(format!("unsupported HTTP method '{s}'")))
    }
}

/// Where a single input value lands in the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Body,
}

impl ParamLocation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Body => "body",
        }
    }
}

impl FromStr for ParamLocation {
    type Err = HttpToolsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Ok(ParamLocation::Path),
            "query" => Ok(ParamLocation::Query),
            "header" => Ok(ParamLocation::Header),
            "body" => Ok(ParamLocation::Body),
            other => Err(HttpToolsError::Config(format!(
                "unsupported parameter location '{other}'"
            ))),
        }
    }
}

/// Binds one field of the caller's input object to one location in the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMapping {
    pub input_key: String,
    pub location: ParamLocation,
    pub target_key: String,
}

impl ParameterMapping {
    #[must_use]
    pub fn new(
        input_key: impl Into<String>,
        location: ParamLocation,
        target_key: impl Into<String>,
    ) -> Self {
        Self {
            input_key: input_key.into(),
            location,
            target_key: target_key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub http_method: HttpMethod,
    pub path_template: String,
    #[serde(default)]
    pub parameter_mappings: Vec<ParameterMapping>,
    pub input_schema: Value,
    /// Set when the operation is known to accept a request body; enables implicit body inference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body_content_type: Option<String>,
}

impl ToolDefinition {
    /// Input keys listed under `inputSchema.required`.
    pub fn required_inputs(&self) -> impl Iterator<Item = &str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    #[must_use]
    pub fn has_body_mapping(&self) -> bool {
        self.parameter_mappings
            .iter()
            .any(|m| m.location == ParamLocation::Body)
    }

    /// Project this definition into an MCP `Tool`.
    #[must_use]
    pub fn to_mcp_tool(&self) -> Tool {
        let schema = match &self.input_schema {
            Value::Object(obj) => obj.clone(),
            _ => {
                let mut obj = JsonObject::new();
                obj.insert("type".to_string(), Value::String("object".to_string()));
                obj
            }
        };
        let mut tool = Tool::new(
            self.name.clone(),
            self.description.clone().unwrap_or_default(),
            Arc::new(schema),
        );
        tool.annotations = Some(annotations_for_method(self.http_method));
        tool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def(schema: Value) -> ToolDefinition {
        ToolDefinition {
            name: "getItem".to_string(),
            description: Some("Fetch one item".to_string()),
            http_method: HttpMethod::Get,
            path_template: "/items/{id}".to_string(),
            parameter_mappings: vec![ParameterMapping::new("id", ParamLocation::Path, "id")],
            input_schema: schema,
            request_body_content_type: None,
        }
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("Patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("PROPFIND".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn serializes_with_camel_case_and_uppercase_method() {
        let v = serde_json::to_value(def(json!({"type": "object"}))).unwrap();
        assert_eq!(v["httpMethod"], json!("GET"));
        assert_eq!(v["pathTemplate"], json!("/items/{id}"));
        assert_eq!(v["parameterMappings"][0]["location"], json!("path"));
        assert!(v.get("requestBodyContentType").is_none());
    }

    #[test]
    fn required_inputs_reads_schema_required_list() {
        let d = def(json!({"type": "object", "required": ["id", 3, "q"]}));
        assert_eq!(d.required_inputs().collect::<Vec<_>>(), vec!["id", "q"]);
        let d = def(json!({"type": "object"}));
        assert_eq!(d.required_inputs().count(), 0);
    }

    #[test]
    fn mcp_tool_carries_schema_and_read_only_annotations() {
        let tool = def(json!({"type": "object", "properties": {"id": {"type": "string"}}}))
            .to_mcp_tool();
        assert_eq!(tool.name, "getItem");
        assert!(tool.input_schema.contains_key("properties"));
        let ann = tool.annotations.unwrap();
        assert_eq!(ann.read_only_hint, Some(true));
    }

    #[test]
    fn mcp_tool_falls_back_to_object_schema() {
        let tool = def(Value::Null).to_mcp_tool();
        assert_eq!(tool.input_schema.get("type"), Some(&json!("object")));
    }
}
