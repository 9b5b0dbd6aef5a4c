//! Registry API queries: keyset-paginated listing and version resolution.

use crate::cache::RegistryCache;
use crate::error::{RegistryError, Result};
use crate::loader::RegistryLoader;
use crate::model::{
    ListServersQuery, OFFICIAL_META_KEY, RegistryEntry, ServerList, ServerListMetadata,
    ServerResponse,
};
use chrono::{SecondsFormat, Utc};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value, json};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_LIMIT: usize = 30;
pub const MAX_LIMIT: usize = 100;

/// Version alias resolved to the highest version of a server.
pub const LATEST: &str = "latest";

#[derive(Debug, Clone)]
pub struct RegistryQueryEngine {
    cache: RegistryCache,
}

impl RegistryQueryEngine {
    #[must_use]
    pub fn new(cache: RegistryCache) -> Self {
        Self { cache }
    }

    #[must_use]
    pub fn from_loader(loader: Arc<dyn RegistryLoader>) -> Self {
        Self::new(RegistryCache::new(loader))
    }

    /// One page of servers in index order.
    ///
    /// `cursor` is the `name:version` of the last entry of the previous page; an unknown cursor
    /// starts from the beginning. Entries whose descriptor cannot be resolved are left out of the
    /// page without shortening the window.
    ///
    /// # Errors
    ///
    /// Returns an error if the index or a descriptor fails to load.
    pub async fn list_servers(&self, query: &ListServersQuery) -> Result<ServerList> {
        let index = self.cache.index().await?;
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        if let Some(since) = &query.updated_since {
            debug!(updated_since = %since, "updated_since filter is not supported; ignoring");
        }

        let start = query
            .cursor
            .as_deref()
            .and_then(|cursor| index.entries.iter().position(|e| e.cursor() == cursor))
            .map_or(0, |i| i + 1);
        let end = (start + limit).min(index.entries.len());
        let slice = &index.entries[start..end];

        let has_next = start + slice.len() < index.entries.len();
        let next_cursor = if has_next {
            slice.last().map(RegistryEntry::cursor)
        } else {
            None
        };

        let mut servers = Vec::with_capacity(slice.len());
        for entry in slice {
            let Some(server) = self.resolve(&entry.name, &entry.version).await? else {
                warn!(name = %entry.name, version = %entry.version, "registry entry did not resolve");
                continue;
            };
            servers.push(ServerResponse {
                server,
                meta: official_meta(),
            });
        }

        Ok(ServerList {
            metadata: ServerListMetadata {
                count: servers.len(),
                next_cursor,
            },
            servers,
        })
    }

    /// Descriptor for `name` (URL-encoded) at `version`, or `"latest"` for the highest version.
    ///
    /// The returned descriptor always carries the resolved `name` and `version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index or the descriptor fails to load.
    pub async fn get_server_version(&self, name: &str, version: &str) -> Result<Option<Value>> {
        let decoded = percent_decode_str(name).decode_utf8_lossy();
        self.resolve(&decoded, version).await
    }

    async fn resolve(&self, name: &str, version: &str) -> Result<Option<Value>> {
        let index = self.cache.index().await?;
        let mut candidates = index.entries.iter().filter(|e| e.name == name);

        let entry = if version == LATEST {
            candidates.fold(None::<&RegistryEntry>, |best, e| match best {
                Some(b) if compare_versions(&e.version, &b.version) != Ordering::Greater => Some(b),
                _ => Some(e),
            })
        } else {
            candidates.find(|e| e.version == version)
        };
        let Some(entry) = entry else {
            return Ok(None);
        };

        let document = self.cache.document(entry.file()).await?;
        let server = document
            .as_object()
            .ok_or_else(|| RegistryError::InvalidFile(entry.file().to_string()))?;

        let matches = server.get("name").and_then(Value::as_str) == Some(entry.name.as_str())
            && server.get("version").and_then(Value::as_str) == Some(entry.version.as_str());
        if matches {
            return Ok(Some(Value::Object(server.clone())));
        }

        let mut corrected = server.clone();
        corrected.insert("name".to_string(), Value::String(entry.name.clone()));
        corrected.insert("version".to_string(), Value::String(entry.version.clone()));
        Ok(Some(Value::Object(corrected)))
    }
}

fn official_meta() -> Map<String, Value> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut meta = Map::new();
    meta.insert(
        OFFICIAL_META_KEY.to_string(),
        json!({"status": "active", "publishedAt": now, "updatedAt": now}),
    );
    meta
}

/// Compare version strings with digit runs ordered numerically (`"1.10.0" > "1.9.0"`).
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a, b);
    loop {
        match (a.is_empty(), b.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        let (ra, rest_a) = split_run(a);
        let (rb, rest_b) = split_run(b);
        let ord = match (is_digits(ra), is_digits(rb)) {
            (true, true) => compare_numeric(ra, rb),
            _ => ra.cmp(rb),
        };
        if ord != Ordering::Equal {
            return ord;
        }
        a = rest_a;
        b = rest_b;
    }
}

fn is_digits(s: &str) -> bool {
    s.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

/// Leading run of all-digit or all-non-digit characters.
fn split_run(s: &str) -> (&str, &str) {
    let digits = is_digits(s);
    let end = s
        .char_indices()
        .find(|(_, c)| c.is_ascii_digit() != digits)
        .map_or(s.len(), |(i, _)| i);
    s.split_at(end)
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
