//! Error types for `mcp-bridge-openapi-tools`.

use mcp_bridge_http_tools::HttpToolsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenApiToolsError {
    /// Caller supplied something unusable (missing source, unknown converter, bad input shape).
    #[error("{0}")]
    InvalidInput(String),

    /// `OpenAPI` document problems (unresolvable refs, unsupported constructs).
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    #[error("OpenAPI error: failed to fetch spec from '{url}': {message}")]
    OpenApiSpecFetch { url: String, message: String },

    #[error("OpenAPI error: failed to read spec body from '{url}': {message}")]
    OpenApiSpecReadBody { url: String, message: String },

    #[error("OpenAPI error: failed to parse spec from '{location}': {message}")]
    OpenApiSpecParse { location: String, message: String },

    /// Upstream tool objects that do not match the expected generator shape.
    #[error("Tool definition error: {0}")]
    ToolShape(String),

    #[error(transparent)]
    Tool(#[from] HttpToolsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OpenApiToolsError {
    /// Whether the failure was caused by the caller's request rather than by the system.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            OpenApiToolsError::InvalidInput(_)
                | OpenApiToolsError::Tool(HttpToolsError::MissingParameter(_))
        )
    }
}

/// Result type alias for `OpenAPI` tooling operations.
pub type Result<T> = std::result::Result<T, OpenApiToolsError>;
