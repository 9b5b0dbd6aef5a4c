use crate::error::Result;
use crate::loader::RegistryLoader;
use crate::model::RegistryIndex;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Lazily populated, never invalidated view of a registry.
///
/// Two tasks racing on a cold entry may both load it; the first insert wins and both observe the
/// same content. Locks guard map access only and are never held across `.await`.
#[derive(Clone)]
pub struct RegistryCache {
    loader: Arc<dyn RegistryLoader>,
    index: Arc<RwLock<Option<Arc<RegistryIndex>>>>,
    documents: Arc<RwLock<HashMap<String, Arc<Value>>>>,
}

impl RegistryCache {
    #[must_use]
    pub fn new(loader: Arc<dyn RegistryLoader>) -> Self {
        Self {
            loader,
            index: Arc::new(RwLock::new(None)),
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// # Errors
    ///
    /// Propagates loader failures; a failed load is not cached.
    pub async fn index(&self) -> Result<Arc<RegistryIndex>> {
        if let Some(index) = self.index.read().clone() {
            return Ok(index);
        }
        let loaded = Arc::new(self.loader.load_index().await?);
        let mut slot = self.index.write();
        Ok(slot.get_or_insert(loaded).clone())
    }

    /// # Errors
    ///
    /// Propagates loader failures; a failed load is not cached.
    pub async fn document(&self, file: &str) -> Result<Arc<Value>> {
        if let Some(doc) = self.documents.read().get(file).cloned() {
            return Ok(doc);
        }
        let loaded = Arc::new(self.loader.load_document(file).await?);
        let mut docs = self.documents.write();
        Ok(docs.entry(file.to_string()).or_insert(loaded).clone())
    }

    #[must_use]
    pub fn cached_documents(&self) -> usize {
        self.documents.read().len()
    }
}

impl std::fmt::Debug for RegistryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCache")
            .field("index_loaded", &self.index.read().is_some())
            .field("documents", &self.cached_documents())
            .finish_non_exhaustive()
    }
}
