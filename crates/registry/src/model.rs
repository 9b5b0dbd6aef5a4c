use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_SERVER_FILE: &str = "server.json";

/// `_meta` key the official registry uses for its publication metadata.
pub const OFFICIAL_META_KEY: &str = "io.modelcontextprotocol.registry/official";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    pub version: String,
    /// Descriptor filename, relative to the registry directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl RegistryEntry {
    #[must_use]
    pub fn file(&self) -> &str {
        self.file.as_deref().unwrap_or(DEFAULT_SERVER_FILE)
    }

    /// Pagination cursor identifying this entry.
    #[must_use]
    pub fn cursor(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryIndex {
    #[serde(default)]
    pub entries: Vec<RegistryEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListServersQuery {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
    /// Accepted for API compatibility; entries carry no timestamps to filter on.
    pub updated_since: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerResponse {
    pub server: Value,
    #[serde(rename = "_meta")]
    pub meta: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerListMetadata {
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerList {
    pub servers: Vec<ServerResponse>,
    pub metadata: ServerListMetadata,
}
