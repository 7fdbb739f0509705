//! Project configuration (`deployer.toml`).
//!
//! ```toml
//! [project]
//! artifacts = "out"
//! deployments = "deployments"
//!
//! [networks.arbitrum-sepolia]
//! chain_id = 421614
//! rpc_url = "https://sepolia-rollup.arbitrum.io/rpc"
//! eid = 40231
//! explorer = { api_url = "https://api.etherscan.io/v2/api" }
//!
//! [[groups.core.deployments]]
//! name = "Vault"
//! contract = "YieldBox"
//! args = ["0x...", { ref = "Cluster" }]
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::consts::{
  DEFAULT_ARTIFACTS_DIR, DEFAULT_DEPLOYMENTS_DIR, DEFAULT_EXECUTOR, DEFAULT_EXPLORER_KEY_ENV, DEFAULT_TAG,
};
use crate::descriptor::BuildDescriptor;
use crate::ledger::{ChainId, validate_tag};

/// The `[project]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSection {
  /// Compiled artifacts root.
  pub artifacts: PathBuf,
  /// Ledger directory.
  pub deployments: PathBuf,
  /// Root that compiler metadata source paths are relative to.
  pub sources: PathBuf,
  pub default_tag: String,
  /// Deployment name of the executor contract `exec` routes calls through.
  pub executor: String,
}

impl Default for ProjectSection {
  fn default() -> Self {
    Self {
      artifacts: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
      deployments: PathBuf::from(DEFAULT_DEPLOYMENTS_DIR),
      sources: PathBuf::from("."),
      default_tag: DEFAULT_TAG.to_string(),
      executor: DEFAULT_EXECUTOR.to_string(),
    }
  }
}

/// Block explorer used for source verification.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExplorerConfig {
  pub api_url: String,
  /// Environment variable holding the API key.
  #[serde(default = "default_key_env")]
  pub api_key_env: String,
}

fn default_key_env() -> String {
  DEFAULT_EXPLORER_KEY_ENV.to_string()
}

impl ExplorerConfig {
  /// The API key, if its environment variable is set and non-empty.
  pub fn api_key(&self) -> Option<String> {
    std::env::var(&self.api_key_env).ok().filter(|key| !key.is_empty())
  }
}

/// A `[networks.<name>]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
  pub chain_id: ChainId,
  pub rpc_url: String,
  #[serde(default = "default_confirmations")]
  pub confirmations: u64,
  /// Cross-chain endpoint id, needed for peer linking.
  #[serde(default)]
  pub eid: Option<u32>,
  #[serde(default)]
  pub explorer: Option<ExplorerConfig>,
}

fn default_confirmations() -> u64 {
  1
}

/// A `[groups.<name>]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
  #[serde(default)]
  pub deployments: Vec<BuildDescriptor>,
}

/// A parsed `deployer.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
  #[serde(default)]
  pub project: ProjectSection,
  #[serde(default)]
  pub networks: BTreeMap<String, NetworkConfig>,
  #[serde(default)]
  pub groups: BTreeMap<String, GroupConfig>,
  #[serde(skip)]
  root: PathBuf,
}

impl ProjectConfig {
  /// Load and parse a config file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ConfigError::NotFound(path.to_path_buf())),
      Err(source) => {
        return Err(ConfigError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Self::parse(&content, root).map_err(|e| match e {
      ConfigError::Parse { source, .. } => ConfigError::Parse {
        path: path.to_path_buf(),
        source,
      },
      other => other,
    })
  }

  /// Parse config text; relative paths resolve against `root`.
  pub fn parse(content: &str, root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
    let mut config: ProjectConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
      path: PathBuf::new(),
      source,
    })?;
    config.root = root.into();
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<(), ConfigError> {
    let mut seen: BTreeMap<ChainId, &str> = BTreeMap::new();
    for (name, network) in &self.networks {
      if let Some(other) = seen.insert(network.chain_id, name) {
        return Err(ConfigError::Invalid(format!(
          "networks '{other}' and '{name}' share chain id {}",
          network.chain_id
        )));
      }
    }
    validate_tag(&self.project.default_tag).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    Ok(())
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn artifacts_dir(&self) -> PathBuf {
    self.root.join(&self.project.artifacts)
  }

  pub fn deployments_dir(&self) -> PathBuf {
    self.root.join(&self.project.deployments)
  }

  pub fn sources_dir(&self) -> PathBuf {
    self.root.join(&self.project.sources)
  }

  /// Look up a network by name.
  ///
  /// With no name given, a config with exactly one network selects it.
  pub fn network(&self, name: Option<&str>) -> Result<(&str, &NetworkConfig), ConfigError> {
    match name {
      Some(name) => self
        .networks
        .get_key_value(name)
        .map(|(k, v)| (k.as_str(), v))
        .ok_or_else(|| ConfigError::UnknownNetwork {
          name: name.to_string(),
          available: self.network_names(),
        }),
      None => match self.networks.iter().next() {
        Some((k, v)) if self.networks.len() == 1 => Ok((k.as_str(), v)),
        _ => Err(ConfigError::NetworkRequired(self.network_names())),
      },
    }
  }

  /// Look up a network by chain id.
  pub fn network_by_chain(&self, chain_id: ChainId) -> Option<(&str, &NetworkConfig)> {
    self
      .networks
      .iter()
      .find(|(_, n)| n.chain_id == chain_id)
      .map(|(k, v)| (k.as_str(), v))
  }

  /// Descriptors of a deployment group.
  pub fn group(&self, name: &str) -> Result<&[BuildDescriptor], ConfigError> {
    self
      .groups
      .get(name)
      .map(|g| g.deployments.as_slice())
      .ok_or_else(|| ConfigError::UnknownGroup {
        name: name.to_string(),
        available: self.groups.keys().cloned().collect::<Vec<_>>().join(", "),
      })
  }

  fn network_names(&self) -> String {
    self.networks.keys().cloned().collect::<Vec<_>>().join(", ")
  }
}

/// Errors loading the project config.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("config file not found: {0}")]
  NotFound(PathBuf),

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid config: {0}")]
  Invalid(String),

  #[error("unknown network '{name}' (available: {available})")]
  UnknownNetwork { name: String, available: String },

  #[error("--network is required (available: {0})")]
  NetworkRequired(String),

  #[error("unknown group '{name}' (available: {available})")]
  UnknownGroup { name: String, available: String },
}
