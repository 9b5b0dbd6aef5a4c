//! Request synthesis: tool definition + caller input -> concrete HTTP request.

use crate::definition::{HttpMethod, ParamLocation, ToolDefinition};
use crate::error::{HttpToolsError, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Map, Value};

/// Characters left untouched when encoding a path segment value (`encodeURIComponent` rules).
const PATH_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// How synthesis treats inputs that the schema marks as required but the caller left out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SynthesisMode {
    /// Skip the mapping; a path placeholder stays literal and headers/query entries are omitted.
    #[default]
    Permissive,
    /// Fail with [`HttpToolsError::MissingParameter`].
    Strict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Wire form of the body: strings go out as-is, everything else as JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn body_bytes(&self) -> Result<Option<Vec<u8>>> {
        match &self.body {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone().into_bytes())),
            Some(other) => serde_json::to_vec(other)
                .map(Some)
                .map_err(|e| HttpToolsError::InvalidRequest(format!("unserializable body: {e}"))),
        }
    }
}

/// Build the outgoing request in permissive mode.
#[must_use]
pub fn synthesize(
    tool: &ToolDefinition,
    base_url: &str,
    input: &Map<String, Value>,
    credential: Option<&str>,
) -> RequestDescriptor {
    build(tool, base_url, input, credential)
}

/// Build the outgoing request, optionally rejecting missing required inputs.
///
/// # Errors
///
/// In [`SynthesisMode::Strict`], returns [`HttpToolsError::MissingParameter`] for the first mapped
/// input that is required by the tool's input schema but absent (or `null`) in `input`.
pub fn synthesize_with_mode(
    tool: &ToolDefinition,
    base_url: &str,
    input: &Map<String, Value>,
    credential: Option<&str>,
    mode: SynthesisMode,
) -> Result<RequestDescriptor> {
    if mode == SynthesisMode::Strict {
        let required: Vec<&str> = tool.required_inputs().collect();
        if let Some(missing) = tool
            .parameter_mappings
            .iter()
            .find(|m| {
                required.contains(&m.input_key.as_str())
                    && input.get(&m.input_key).is_none_or(Value::is_null)
            })
        {
            return Err(HttpToolsError::MissingParameter(missing.input_key.clone()));
        }
    }
    Ok(build(tool, base_url, input, credential))
}

fn build(
    tool: &ToolDefinition,
    base_url: &str,
    input: &Map<String, Value>,
    credential: Option<&str>,
) -> RequestDescriptor {
    let base = if tool.path_template.starts_with('/') {
        base_url.trim_end_matches('/')
    } else {
        base_url
    };
    let mut url = format!("{base}{}", tool.path_template);

    let mut headers: Vec<(String, String)> = Vec::new();
    set_header(&mut headers, "Content-Type", "application/json".to_string());
    if let Some(credential) = credential.filter(|c| !c.is_empty()) {
        let value = if credential.starts_with("Bearer ") {
            credential.to_string()
        } else {
            format!("Bearer {credential}")
        };
        set_header(&mut headers, "Authorization", value);
    }

    let mut query: Vec<(String, String)> = Vec::new();
    let mut body: Option<Value> = None;

    for mapping in &tool.parameter_mappings {
        let Some(value) = input.get(&mapping.input_key) else {
            continue;
        };

        match mapping.location {
            ParamLocation::Path => {
                let placeholder = format!("{{{}}}", mapping.target_key);
                let encoded = utf8_percent_encode(&value_to_string(value), PATH_VALUE).to_string();
                url = url.replacen(&placeholder, &encoded, 1);
            }
            ParamLocation::Query => {
                let rendered = value_to_string(value);
                match query.iter_mut().find(|(k, _)| *k == mapping.target_key) {
                    Some(pair) => pair.1 = rendered,
                    None => query.push((mapping.target_key.clone(), rendered)),
                }
            }
            ParamLocation::Header => {
                set_header(&mut headers, &mapping.target_key, value_to_string(value));
            }
            ParamLocation::Body => body = Some(value.clone()).filter(|v| !v.is_null()),
        }
    }

    if body.is_none() && tool.request_body_content_type.is_some() && !input.is_empty() {
        body = Some(Value::Object(input.clone()));
    }

    if !query.is_empty() {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.iter())
            .finish();
        url.push('?');
        url.push_str(&encoded);
    }

    RequestDescriptor {
        method: tool.http_method,
        url,
        headers,
        body,
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(slot) => *slot = (name.to_string(), value),
        None => headers.push((name.to_string(), value)),
    }
}

/// String coercion used for path, query and header values.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => value_to_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ParameterMapping;
    use serde_json::json;

    fn tool(method: HttpMethod, path: &str, mappings: Vec<ParameterMapping>) -> ToolDefinition {
        ToolDefinition {
            name: "t".to_string(),
            description: None,
            http_method: method,
            path_template: path.to_string(),
            parameter_mappings: mappings,
            input_schema: json!({"type": "object", "required": ["id"]}),
            request_body_content_type: None,
        }
    }

    fn input(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn path_values_are_component_encoded() {
        let t = tool(
            HttpMethod::Get,
            "/items/{id}",
            vec![ParameterMapping::new("id", ParamLocation::Path, "id")],
        );
        let req = synthesize(&t, "https://api.test", &input(json!({"id": "a/b"})), None);
        assert_eq!(req.url, "https://api.test/items/a%2Fb");

        let req = synthesize(&t, "https://api.test", &input(json!({"id": "x y(1)*"})), None);
        assert_eq!(req.url, "https://api.test/items/x%20y(1)*");
    }

    #[test]
    fn missing_path_value_keeps_placeholder() {
        let t = tool(
            HttpMethod::Get,
            "/items/{id}",
            vec![ParameterMapping::new("id", ParamLocation::Path, "id")],
        );
        let req = synthesize(&t, "https://api.test/", &Map::new(), None);
        assert_eq!(req.url, "https://api.test/items/{id}");

    }

    #[test]
    fn null_values_are_rendered_not_skipped() {
        let t = tool(
            HttpMethod::Get,
            "/items/{id}",
            vec![
                ParameterMapping::new("id", ParamLocation::Path, "id"),
                ParameterMapping::new("q", ParamLocation::Query, "q"),
                ParameterMapping::new("trace", ParamLocation::Header, "X-Trace"),
            ],
        );
        let req = synthesize(
            &t,
            "http://x",
            &input(json!({"id": null, "q": null, "trace": null})),
            None,
        );
        assert_eq!(req.url, "http://x/items/null?q=null");
        assert_eq!(req.header("x-trace"), Some("null"));
    }

    #[test]
    fn null_body_mapping_falls_back_to_whole_input() {
        let mut t = tool(
            HttpMethod::Post,
            "/items",
            vec![ParameterMapping::new("payload", ParamLocation::Body, "body")],
        );
        t.request_body_content_type = Some("application/json".to_string());
        let req = synthesize(&t, "http://x", &input(json!({"payload": null, "name": "a"})), None);
        assert_eq!(req.body, Some(json!({"payload": null, "name": "a"})));
    }

    #[test]
    fn only_first_placeholder_occurrence_is_replaced() {
        let t = tool(
            HttpMethod::Get,
            "/a/{id}/b/{id}",
            vec![ParameterMapping::new("id", ParamLocation::Path, "id")],
        );
        let req = synthesize(&t, "http://x", &input(json!({"id": 1})), None);
        assert_eq!(req.url, "http://x/a/1/b/{id}");
    }

    #[test]
    fn strict_mode_treats_null_required_input_as_missing() {
        let t = tool(
            HttpMethod::Get,
            "/items/{id}",
            vec![ParameterMapping::new("id", ParamLocation::Path, "id")],
        );
        let err = synthesize_with_mode(
            &t,
            "http://x",
            &input(json!({"id": null})),
            None,
            SynthesisMode::Strict,
        )
        .unwrap_err();
        assert!(matches!(err, HttpToolsError::MissingParameter(k) if k == "id"));
    }

    #[test]
    fn strict_mode_rejects_missing_required_input() {
        let t = tool(
            HttpMethod::Get,
            "/items/{id}",
            vec![ParameterMapping::new("id", ParamLocation::Path, "id")],
        );
        let err = synthesize_with_mode(&t, "http://x", &Map::new(), None, SynthesisMode::Strict)
            .unwrap_err();
        assert!(matches!(err, HttpToolsError::MissingParameter(k) if k == "id"));

        let ok = synthesize_with_mode(
            &t,
            "http://x",
            &input(json!({"id": 7})),
            None,
            SynthesisMode::Strict,
        )
        .unwrap();
        assert_eq!(ok.url, "http://x/items/7");
    }

    #[test]
    fn query_and_headers_are_coerced_to_strings() {
        let t = tool(
            HttpMethod::Get,
            "/search",
            vec![
                ParameterMapping::new("q", ParamLocation::Query, "q"),
                ParameterMapping::new("tags", ParamLocation::Query, "tags"),
                ParameterMapping::new("page", ParamLocation::Query, "page"),
                ParameterMapping::new("again", ParamLocation::Query, "q"),
                ParameterMapping::new("trace", ParamLocation::Header, "X-Trace"),
            ],
        );
        let req = synthesize(
            &t,
            "http://x",
            &input(json!({
                "q": "hello world",
                "tags": ["a", "b"],
                "page": 2,
                "again": "second",
                "trace": true
            })),
            None,
        );
        assert_eq!(req.url, "http://x/search?q=second&tags=a%2Cb&page=2");
        assert_eq!(req.header("x-trace"), Some("true"));
    }

    #[test]
    fn empty_query_adds_no_question_mark() {
        let t = tool(
            HttpMethod::Get,
            "/search",
            vec![ParameterMapping::new("q", ParamLocation::Query, "q")],
        );
        let req = synthesize(&t, "http://x", &Map::new(), None);
        assert_eq!(req.url, "http://x/search");
    }

    #[test]
    fn credential_becomes_bearer_authorization() {
        let t = tool(HttpMethod::Get, "/me", vec![]);
        let req = synthesize(&t, "http://x", &Map::new(), Some("abc"));
        assert_eq!(req.header("authorization"), Some("Bearer abc"));
        assert_eq!(req.header("content-type"), Some("application/json"));

        let req = synthesize(&t, "http://x", &Map::new(), Some("Bearer xyz"));
        assert_eq!(req.header("Authorization"), Some("Bearer xyz"));

        let req = synthesize(&t, "http://x", &Map::new(), Some(""));
        assert_eq!(req.header("Authorization"), None);
    }

    #[test]
    fn header_mapping_overrides_default_headers() {
        let t = tool(
            HttpMethod::Post,
            "/upload",
            vec![ParameterMapping::new("ct", ParamLocation::Header, "content-type")],
        );
        let req = synthesize(&t, "http://x", &input(json!({"ct": "text/plain"})), None);
        assert_eq!(req.header("Content-Type"), Some("text/plain"));
        assert_eq!(req.headers.len(), 1);
    }

    #[test]
    fn explicit_body_wins_over_implicit_inference() {
        let mut t = tool(
            HttpMethod::Post,
            "/pets",
            vec![ParameterMapping::new("body", ParamLocation::Body, "body")],
        );
        t.request_body_content_type = Some("application/json".to_string());
        let req = synthesize(
            &t,
            "http://x",
            &input(json!({"body": {"name": "rex"}, "other": 1})),
            None,
        );
        assert_eq!(req.body, Some(json!({"name": "rex"})));
    }

    #[test]
    fn implicit_body_uses_whole_input_when_operation_accepts_body() {
        let mut t = tool(HttpMethod::Post, "/pets", vec![]);
        t.request_body_content_type = Some("application/json".to_string());
        let req = synthesize(&t, "http://x", &input(json!({"name": "rex", "age": 3})), None);
        assert_eq!(req.body, Some(json!({"name": "rex", "age": 3})));

        let req = synthesize(&t, "http://x", &Map::new(), None);
        assert_eq!(req.body, None);

        t.request_body_content_type = None;
        let req = synthesize(&t, "http://x", &input(json!({"name": "rex"})), None);
        assert_eq!(req.body, None);
    }

    #[test]
    fn last_body_mapping_with_value_wins() {
        let t = tool(
            HttpMethod::Post,
            "/pets",
            vec![
                ParameterMapping::new("a", ParamLocation::Body, "body"),
                ParameterMapping::new("b", ParamLocation::Body, "body"),
            ],
        );
        let req = synthesize(&t, "http://x", &input(json!({"a": 1, "b": 2})), None);
        assert_eq!(req.body, Some(json!(2)));
        let req = synthesize(&t, "http://x", &input(json!({"a": 1})), None);
        assert_eq!(req.body, Some(json!(1)));
    }

    #[test]
    fn string_body_is_sent_verbatim() {
        let req = RequestDescriptor {
            method: HttpMethod::Post,
            url: "http://x".to_string(),
            headers: Vec::new(),
            body: Some(json!("raw text")),
        };
        assert_eq!(req.body_bytes().unwrap().unwrap(), b"raw text".to_vec());

        let req = RequestDescriptor {
            body: Some(json!({"a": 1})),
            ..req
        };
        assert_eq!(req.body_bytes().unwrap().unwrap(), br#"{"a":1}"#.to_vec());
    }
}
