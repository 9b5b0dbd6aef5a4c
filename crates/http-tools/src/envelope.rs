//! Protocol-neutral result envelope and response normalization.

use crate::error::{HttpToolsError, Result};
use crate::transport::RawResponse;
use rmcp::model::{CallToolResult, Content};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub content: Vec<ContentBlock>,
    pub is_error: bool,
}

impl ResultEnvelope {
    #[must_use]
    pub fn text(text: impl Into<String>, is_error: bool) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            is_error,
        }
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self::text(text, true)
    }

    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().map(|ContentBlock::Text { text }| text.as_str()).next()
    }
}

impl From<ResultEnvelope> for CallToolResult {
    fn from(envelope: ResultEnvelope) -> Self {
        let content = envelope
            .content
            .into_iter()
            .map(|ContentBlock::Text { text }| Content::text(text))
            .collect();
        CallToolResult {
            content,
            structured_content: None,
            is_error: Some(envelope.is_error),
            meta: None,
        }
    }
}

/// Turn a raw upstream response into a result envelope.
///
/// JSON bodies are re-serialized with 2-space indentation; everything else is passed through as
/// text. Any non-2xx status marks the envelope as an error.
///
/// # Errors
///
/// Returns [`HttpToolsError::ResponseDecode`] when the response claims to be JSON but its body
/// does not parse.
pub fn normalize(raw: &RawResponse) -> Result<ResultEnvelope> {
    let text = if raw.content_type().is_some_and(is_json_content_type) {
        let value: Value = serde_json::from_slice(&raw.body).map_err(HttpToolsError::ResponseDecode)?;
        serde_json::to_string_pretty(&value).map_err(HttpToolsError::ResponseDecode)?
    } else {
        String::from_utf8_lossy(&raw.body).into_owned()
    };
    Ok(ResultEnvelope::text(text, !raw.is_success()))
}

fn is_json_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("application/json")
}
