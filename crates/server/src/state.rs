use crate::config::{BridgeConfig, SpecsConfig};
use mcp_bridge_http_tools::HttpExecutor;
use mcp_bridge_openapi_tools::{CatalogOptions, CatalogService};
use mcp_bridge_registry::{FsRegistryLoader, RegistryQueryEngine};
use std::sync::Arc;

/// Shared by every request. Only the registry cache is mutable.
#[derive(Debug, Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub registry: RegistryQueryEngine,
    pub specs: SpecsConfig,
}

impl AppState {
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP client cannot be built.
    pub fn new(config: BridgeConfig) -> anyhow::Result<Self> {
        let executor = HttpExecutor::new(config.outbound)?;
        let catalog = CatalogService::new(
            executor,
            CatalogOptions {
                tools_dump: config.tools_dump,
                synthesis_mode: config.execution.synthesis_mode(),
            },
        );

        let loader = FsRegistryLoader::new(config.registry.dir).with_index_file(config.registry.index);
        let registry = RegistryQueryEngine::from_loader(Arc::new(loader));

        Ok(Self {
            catalog,
            registry,
            specs: config.specs,
        })
    }
}
