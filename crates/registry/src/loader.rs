use crate::error::{RegistryError, Result};
use crate::model::RegistryIndex;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub const DEFAULT_INDEX_FILE: &str = "registry-index.json";

/// Where registry data comes from.
#[async_trait]
pub trait RegistryLoader: Send + Sync {
    async fn load_index(&self) -> Result<RegistryIndex>;

    /// Load one server descriptor by its index filename.
    async fn load_document(&self, file: &str) -> Result<Value>;
}

/// Reads the index and descriptors from a directory.
#[derive(Debug, Clone)]
pub struct FsRegistryLoader {
    dir: PathBuf,
    index_file: String,
}

impl FsRegistryLoader {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            index_file: DEFAULT_INDEX_FILE.to_string(),
        }
    }

    #[must_use]
    pub fn with_index_file(mut self, index_file: impl Into<String>) -> Self {
        self.index_file = index_file.into();
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn resolve(&self, file: &str) -> Result<PathBuf> {
        let rel = Path::new(file);
        let contained = !file.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return Err(RegistryError::InvalidFile(file.to_string()));
        }
        Ok(self.dir.join(rel))
    }
}

async fn read_json<T: DeserializeOwned>(path: PathBuf) -> Result<T> {
    debug!(path = %path.display(), "reading registry file");
    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| RegistryError::Io {
            path: path.clone(),
            source,
        })?;
    serde_json::from_str(&raw).map_err(|source| RegistryError::Parse { path, source })
}

#[async_trait]
impl RegistryLoader for FsRegistryLoader {
    async fn load_index(&self) -> Result<RegistryIndex> {
        let path = self.resolve(&self.index_file)?;
        read_json(path).await
    }

    async fn load_document(&self, file: &str) -> Result<Value> {
        let path = self.resolve(file)?;
        read_json(path).await
    }
}
