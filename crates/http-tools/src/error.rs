use crate::safety::sanitize_reqwest_error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpToolsError {
    #[error("config error: {0}")]
    Config(String),
    #[error("missing required parameter '{0}'")]
    MissingParameter(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("http transport error: {0}")]
    Transport(String),
    #[error("failed to decode JSON response body: {0}")]
    ResponseDecode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HttpToolsError>;

impl HttpToolsError {
    /// Failures that happened while talking to the upstream API.
    ///
    /// These are reported back to the caller inside an error envelope instead of failing the
    /// whole call.
    #[must_use]
    pub fn is_upstream_failure(&self) -> bool {
        matches!(
            self,
            HttpToolsError::InvalidRequest(_) | HttpToolsError::Http(_) | HttpToolsError::Transport(_)
        )
    }
}

impl From<reqwest::Error> for HttpToolsError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(sanitize_reqwest_error(&value))
    }
}
