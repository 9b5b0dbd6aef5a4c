//! `OpenAPI` -> tool tooling.
//!
//! A spec source is loaded, one of two generators turns its operations into an upstream tool
//! shape, and that shape is normalized into the canonical [`ToolDefinition`] that
//! `mcp-bridge-http-tools` knows how to execute. [`CatalogService`] ties the steps together.
//!
//! [`ToolDefinition`]: mcp_bridge_http_tools::ToolDefinition

pub mod catalog;
pub mod error;
pub mod generator;
pub mod normalize;
pub mod resolver;
pub mod source;

pub use catalog::{
    CatalogOptions, CatalogService, ConverterKind, ListedTool, LoadedCatalog, McpToolList,
    RichConverter, SimpleConverter, ToolConverter, ToolListing,
};
pub use error::{OpenApiToolsError, Result};
pub use normalize::{UpstreamTools, normalize_rich, normalize_simple, normalize_upstream};
pub use source::{LoadedSpec, SpecSource};
