//! Transport executor: sends exactly one request per call and captures the raw response.

use crate::error::{HttpToolsError, Result};
use crate::request::RequestDescriptor;
use crate::safety::{OutboundPolicy, redact_url};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Shared HTTP executor. Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    policy: OutboundPolicy,
}

impl HttpExecutor {
    /// Build an executor for the given outbound policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(policy: OutboundPolicy) -> Result<Self> {
        let client = Client::builder()
            .redirect(policy.redirect_policy())
            .build()
            .map_err(HttpToolsError::from)?;
        Ok(Self { client, policy })
    }

    #[must_use]
    pub fn with_client(client: Client, policy: OutboundPolicy) -> Self {
        Self { client, policy }
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub fn policy(&self) -> &OutboundPolicy {
        &self.policy
    }

    /// Issue the request. No retries, no timeout beyond the client default.
    ///
    /// # Errors
    ///
    /// Returns [`HttpToolsError::InvalidRequest`] for a malformed URL or header,
    /// [`HttpToolsError::Http`] when the outbound policy blocks the call or the body exceeds the
    /// size limit, and [`HttpToolsError::Transport`] for network failures.
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<RawResponse> {
        let url = Url::parse(&request.url).map_err(|e| {
            HttpToolsError::InvalidRequest(format!("invalid URL '{}': {e}", request.url))
        })?;
        self.policy.check_url(&url).await?;

        let headers = header_map(&request.headers)?;
        let target = redact_url(&url);
        debug!(method = %request.method, url = %target, "sending upstream request");

        let mut builder = self
            .client
            .request(request.method.as_reqwest(), url)
            .headers(headers);
        if let Some(bytes) = request.body_bytes()? {
            builder = builder.body(bytes);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = read_body_limited(response, self.policy.max_response_bytes).await?;

        debug!(status, url = %target, bytes = body.len(), "upstream responded");
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HttpToolsError::InvalidRequest(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            HttpToolsError::InvalidRequest(format!("invalid value for header '{name}': {e}"))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

async fn read_body_limited(
    mut response: reqwest::Response,
    max_bytes: Option<usize>,
) -> Result<Vec<u8>> {
    let Some(max) = max_bytes else {
        return Ok(response.bytes().await?.to_vec());
    };

    if let Some(len) = response.content_length()
        && len > max as u64
    {
        return Err(HttpToolsError::Http(format!(
            "response too large: {len} bytes (limit {max})"
        )));
    }

    let mut out: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if out.len().saturating_add(chunk.len()) > max {
            return Err(HttpToolsError::Http(format!(
                "response too large: exceeded {max} bytes"
            )));
        }
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}
