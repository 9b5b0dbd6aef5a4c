//! Read-only MCP server registry.
//!
//! The registry is a static index of `(name, version, file)` entries plus one JSON descriptor file
//! per entry. [`RegistryQueryEngine`] answers the two registry API queries on top of a lazily
//! populated [`RegistryCache`].

pub mod cache;
pub mod error;
pub mod loader;
pub mod model;
pub mod query;

pub use cache::RegistryCache;
pub use error::{RegistryError, Result};
pub use loader::{DEFAULT_INDEX_FILE, FsRegistryLoader, RegistryLoader};
pub use model::{
    DEFAULT_SERVER_FILE, ListServersQuery, OFFICIAL_META_KEY, RegistryEntry, RegistryIndex,
    ServerList, ServerListMetadata, ServerResponse,
};
pub use query::RegistryQueryEngine;
