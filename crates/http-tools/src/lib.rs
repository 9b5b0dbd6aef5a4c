//! HTTP tool runtime for the OpenAPI bridge.
//!
//! Everything here works on the canonical [`ToolDefinition`]. It never looks at `OpenAPI`
//! documents and does not care which generator produced a definition.

pub mod definition;
pub mod envelope;
pub mod error;
pub mod request;
pub mod safety;
pub mod semantics;
pub mod transport;

pub use definition::{HttpMethod, ParamLocation, ParameterMapping, ToolDefinition};
pub use envelope::{ContentBlock, ResultEnvelope};
pub use error::{HttpToolsError, Result};
pub use request::{RequestDescriptor, SynthesisMode};
pub use safety::OutboundPolicy;
pub use transport::{HttpExecutor, RawResponse};
