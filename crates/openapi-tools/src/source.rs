//! Spec sources: where an `OpenAPI` document comes from and how it is loaded.

use crate::error::{OpenApiToolsError, Result};
use mcp_bridge_http_tools::HttpExecutor;
use mcp_bridge_http_tools::safety::sanitize_reqwest_error;
use openapiv3::OpenAPI;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::info;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum SpecSource {
    /// Fetched on every load.
    Url(Url),
    /// An already-parsed document.
    Document(Value),
    /// JSON or YAML document text.
    Text(String),
}

impl SpecSource {
    /// Resolve the caller's `spec` / `specUrl` pair. `specUrl` wins when both are present.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::InvalidInput`] if neither is present, if a URL does not
    /// parse, or if `spec` is neither an object nor a string.
    pub fn from_request(spec: Option<&Value>, spec_url: Option<&str>) -> Result<Self> {
        if let Some(url) = spec_url.filter(|u| !u.is_empty()) {
            return Self::parse_url(url);
        }

        match spec {
            None | Some(Value::Null) => Err(OpenApiToolsError::InvalidInput(
                "Either spec or specUrl required".to_string(),
            )),
            Some(Value::String(s)) if s.is_empty() => Err(OpenApiToolsError::InvalidInput(
                "Either spec or specUrl required".to_string(),
            )),
            Some(Value::String(s)) if is_http_url(s) => Self::parse_url(s),
            Some(Value::String(s)) => Ok(SpecSource::Text(s.clone())),
            Some(doc @ Value::Object(_)) => Ok(SpecSource::Document(doc.clone())),
            Some(_) => Err(OpenApiToolsError::InvalidInput(
                "spec must be an OpenAPI document object, document text, or a URL".to_string(),
            )),
        }
    }

    fn parse_url(raw: &str) -> Result<Self> {
        Url::parse(raw)
            .map(SpecSource::Url)
            .map_err(|e| OpenApiToolsError::InvalidInput(format!("Invalid spec URL '{raw}': {e}")))
    }

    /// The URL the document was fetched from, used to resolve relative server URLs.
    #[must_use]
    pub fn origin(&self) -> Option<&Url> {
        match self {
            SpecSource::Url(u) => Some(u),
            SpecSource::Document(_) | SpecSource::Text(_) => None,
        }
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            SpecSource::Url(u) => u.to_string(),
            SpecSource::Document(_) => "inline document".to_string(),
            SpecSource::Text(_) => "inline text".to_string(),
        }
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// A parsed document together with its raw JSON form (used for `$ref` lookups).
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    pub raw: Value,
    pub document: OpenAPI,
    pub origin: Option<Url>,
    /// `sha256:<hex>` of the compact JSON form.
    pub fingerprint: String,
}

/// Fetch (if needed) and parse a spec source.
///
/// # Errors
///
/// Returns an error if the outbound policy blocks the spec URL, if fetching fails or yields a
/// non-2xx status, or if the content is not a parseable `OpenAPI` document.
pub async fn load(source: &SpecSource, executor: &HttpExecutor) -> Result<LoadedSpec> {
    let location = source.describe();
    let raw = match source {
        SpecSource::Url(url) => {
            info!(url = %url, "fetching OpenAPI spec");
            let text = fetch(url, executor).await?;
            parse_text(&text, &location)?
        }
        SpecSource::Text(text) => parse_text(text, &location)?,
        SpecSource::Document(doc) => doc.clone(),
    };

    let document: OpenAPI = serde_json::from_value(raw.clone()).map_err(|e| {
        OpenApiToolsError::OpenApiSpecParse {
            location: location.clone(),
            message: e.to_string(),
        }
    })?;

    let fingerprint = format!(
        "sha256:{}",
        hex::encode(Sha256::digest(serde_json::to_vec(&raw)?))
    );

    Ok(LoadedSpec {
        raw,
        document,
        origin: source.origin().cloned(),
        fingerprint,
    })
}

async fn fetch(url: &Url, executor: &HttpExecutor) -> Result<String> {
    let fetch_err = |message: String| OpenApiToolsError::OpenApiSpecFetch {
        url: url.to_string(),
        message,
    };

    executor
        .policy()
        .check_url(url)
        .await
        .map_err(|e| fetch_err(e.to_string()))?;

    let resp = executor
        .client()
        .get(url.clone())
        .send()
        .await
        .map_err(|e| fetch_err(sanitize_reqwest_error(&e)))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(fetch_err(format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )));
    }

    resp.text()
        .await
        .map_err(|e| OpenApiToolsError::OpenApiSpecReadBody {
            url: url.to_string(),
            message: sanitize_reqwest_error(&e),
        })
}

/// JSON first, then YAML. YAML goes through `serde_yaml::Value` so integer keys (status codes)
/// survive as JSON object keys.
fn parse_text(text: &str, location: &str) -> Result<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        return Ok(v);
    }
    let parse_err = |message: String| OpenApiToolsError::OpenApiSpecParse {
        location: location.to_string(),
        message,
    };
    let yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| parse_err(e.to_string()))?;
    let value = serde_json::to_value(yaml).map_err(|e| parse_err(e.to_string()))?;
    if !value.is_object() {
        return Err(parse_err("document is not a mapping".to_string()));
    }
    Ok(value)
}
