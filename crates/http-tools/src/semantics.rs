//! MCP `ToolAnnotations` derived from HTTP method semantics (RFC 9110).

use crate::definition::HttpMethod;
use rmcp::model::ToolAnnotations;

/// Every HTTP tool talks to an external system, so `openWorldHint` is always `true`.
#[must_use]
pub fn annotations_for_method(method: HttpMethod) -> ToolAnnotations {
    let (read_only, destructive, idempotent) = match method {
        HttpMethod::Get | HttpMethod::Head | HttpMethod::Options | HttpMethod::Trace => {
            (true, false, Some(true))
        }
        HttpMethod::Post => (false, false, Some(false)),
        HttpMethod::Put | HttpMethod::Delete => (false, true, Some(true)),
        // PATCH may or may not be idempotent; do not guess.
        HttpMethod::Patch => (false, true, None),
    };

    ToolAnnotations {
        title: None,
        read_only_hint: Some(read_only),
        destructive_hint: Some(destructive),
        idempotent_hint: idempotent,
        open_world_hint: Some(true),
    }
}
