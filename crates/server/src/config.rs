use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use mcp_bridge_http_tools::{OutboundPolicy, SynthesisMode};
use mcp_bridge_registry::DEFAULT_INDEX_FILE;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "mcp-bridge")]
#[command(about = "Expose OpenAPI operations as callable tools and serve a read-only MCP registry")]
pub struct Args {
    /// YAML config file. Without one, every setting takes its default.
    #[arg(long, env = "MCP_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "MCP_BRIDGE_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Default log filter; `RUST_LOG` takes precedence when set.
    #[arg(long, env = "MCP_BRIDGE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, env = "MCP_BRIDGE_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    pub registry: RegistryConfig,
    pub specs: SpecsConfig,
    /// Where the latest generated tool list is written for debugging.
    pub tools_dump: Option<PathBuf>,
    pub execution: ExecutionConfig,
    pub outbound: OutboundPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfig {
    pub dir: PathBuf,
    pub index: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            index: DEFAULT_INDEX_FILE.to_string(),
        }
    }
}

/// Locally hosted spec documents served under `/api/openapi/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecsConfig {
    pub dir: PathBuf,
    pub allowed: Vec<String>,
}

impl Default for SpecsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            allowed: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionConfig {
    /// Reject executions that omit a required mapped input instead of sending the request.
    pub strict_parameters: bool,
}

impl ExecutionConfig {
    #[must_use]
    pub fn synthesis_mode(self) -> SynthesisMode {
        if self.strict_parameters {
            SynthesisMode::Strict
        } else {
            SynthesisMode::Permissive
        }
    }
}

/// Load the config file, or defaults when no path is given.
///
/// # Errors
///
/// Returns an error if an explicitly given file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<BridgeConfig> {
    let Some(path) = path else {
        return Ok(BridgeConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(BridgeConfig::default());
    }
    let cfg: BridgeConfig =
        serde_yaml::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_means_defaults() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg, BridgeConfig::default());
        assert_eq!(cfg.registry.index, "registry-index.json");
        assert_eq!(cfg.execution.synthesis_mode(), SynthesisMode::Permissive);
        assert!(cfg.outbound.allow_private_networks);
    }

    #[test]
    fn parses_camel_case_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.yaml");
        std::fs::write(
            &path,
            r"
registry:
  dir: /srv/registry
specs:
  dir: /srv/specs
  allowed: [openapi1, openapi2]
toolsDump: /tmp/tools-output.json
execution:
  strictParameters: true
outbound:
  allowPrivateNetworks: false
  maxResponseBytes: 1024
",
        )
        .unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.registry.dir, PathBuf::from("/srv/registry"));
        assert_eq!(cfg.registry.index, "registry-index.json");
        assert_eq!(cfg.specs.allowed, ["openapi1", "openapi2"]);
        assert_eq!(cfg.tools_dump, Some(PathBuf::from("/tmp/tools-output.json")));
        assert_eq!(cfg.execution.synthesis_mode(), SynthesisMode::Strict);
        assert!(!cfg.outbound.allow_private_networks);
        assert_eq!(cfg.outbound.max_response_bytes, Some(1024));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(err.to_string().contains("read config"));
    }

    #[test]
    fn cli_defaults() {
        let args = Args::try_parse_from(["mcp-bridge"]).unwrap();
        assert_eq!(args.bind, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(args.log_format, LogFormat::Text);

        let args = Args::try_parse_from(["mcp-bridge", "--log-format", "json", "--bind", "0.0.0.0:8080"])
            .unwrap();
        assert_eq!(args.log_format, LogFormat::Json);
        assert_eq!(args.bind.port(), 8080);
    }
}
