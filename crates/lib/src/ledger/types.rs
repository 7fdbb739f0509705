//! Ledger record and manifest types.
//!
//! A [`ChainManifest`] is the persisted deployment document for one tag. It maps
//! chain ids to the ordered list of [`DeploymentRecord`]s deployed on that chain.
//!
//! # File Shape
//!
//! ```json
//! {
//!   "421614": [
//!     { "name": "Vault", "address": "0x...", "meta": { "contract": "YieldBox" } }
//!   ]
//! }
//! ```
//!
//! Other tooling consumes this file, so chain order, record order and `meta` key
//! order are preserved across rewrites.

use std::fmt;
use std::path::PathBuf;

use alloy::primitives::Address;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// EIP-155 chain id.
pub type ChainId = u64;

/// A single deployed contract instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
  /// Deployment name, unique per (chain, tag).
  pub name: String,
  /// Address the contract was deployed at.
  pub address: Address,
  /// Free-form metadata (constructor args, tx hash, resolved dependencies).
  #[serde(default)]
  pub meta: Map<String, Value>,
}

impl DeploymentRecord {
  pub fn new(name: impl Into<String>, address: Address) -> Self {
    Self {
      name: name.into(),
      address,
      meta: Map::new(),
    }
  }

  /// Name of the artifact this record was deployed from, if recorded.
  pub fn contract(&self) -> Option<&str> {
    self.meta.get("contract").and_then(Value::as_str)
  }

  /// Resolved constructor arguments, if recorded.
  pub fn args(&self) -> Option<&Vec<Value>> {
    self.meta.get("args").and_then(Value::as_array)
  }
}

/// The deployment document for a single tag.
///
/// Serialized as a JSON object keyed by chain id. Entries keep their insertion
/// order, which is also the order they were read from disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainManifest {
  chains: Vec<(ChainId, Vec<DeploymentRecord>)>,
}

impl ChainManifest {
  pub fn new() -> Self {
    Self::default()
  }

  /// Records for a chain, in ledger order.
  pub fn records(&self, chain_id: ChainId) -> &[DeploymentRecord] {
    self
      .chains
      .iter()
      .find(|(id, _)| *id == chain_id)
      .map(|(_, records)| records.as_slice())
      .unwrap_or(&[])
  }

  /// Look up a record by name on a chain.
  pub fn get(&self, chain_id: ChainId, name: &str) -> Option<&DeploymentRecord> {
    self.records(chain_id).iter().find(|r| r.name == name)
  }

  /// Chain ids present in the document, in file order.
  pub fn chain_ids(&self) -> Vec<ChainId> {
    self.chains.iter().map(|(id, _)| *id).collect()
  }

  /// Insert or replace a record.
  ///
  /// An existing record with the same name keeps its position; new names are
  /// appended at the end of the chain's list.
  pub fn upsert(&mut self, chain_id: ChainId, record: DeploymentRecord) {
    let idx = match self.chains.iter().position(|(id, _)| *id == chain_id) {
      Some(idx) => idx,
      None => {
        self.chains.push((chain_id, Vec::new()));
        self.chains.len() - 1
      }
    };
    let records = &mut self.chains[idx].1;

    match records.iter_mut().find(|r| r.name == record.name) {
      Some(existing) => *existing = record,
      None => records.push(record),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.chains.iter().all(|(_, records)| records.is_empty())
  }
}

impl Serialize for ChainManifest {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.chains.len()))?;
    for (chain_id, records) in &self.chains {
      map.serialize_entry(&chain_id.to_string(), records)?;
    }
    map.end()
  }
}

impl<'de> Deserialize<'de> for ChainManifest {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct ManifestVisitor;

    impl<'de> Visitor<'de> for ManifestVisitor {
      type Value = ChainManifest;

      fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object keyed by chain id")
      }

      fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut chains: Vec<(ChainId, Vec<DeploymentRecord>)> = Vec::new();
        while let Some((key, records)) = access.next_entry::<String, Vec<DeploymentRecord>>()? {
          let chain_id: ChainId = key
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid chain id key: {key}")))?;
          if chains.iter().any(|(id, _)| *id == chain_id) {
            return Err(serde::de::Error::custom(format!("duplicate chain id: {chain_id}")));
          }
          chains.push((chain_id, records));
        }
        Ok(ChainManifest { chains })
      }
    }

    deserializer.deserialize_map(ManifestVisitor)
  }
}

/// Errors that can occur reading or writing the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
  #[error("failed to create ledger directory: {0}")]
  CreateDir(#[source] std::io::Error),

  #[error("failed to read manifest {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write manifest {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The manifest exists but cannot be parsed. Never repaired automatically.
  #[error("manifest {path} is corrupt: {source}")]
  ManifestCorrupt {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize manifest: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("invalid tag '{0}': use letters, digits, '_', '-' or '.'")]
  InvalidTag(String),
}

/// Check that a tag can name a manifest file inside the ledger directory.
pub fn validate_tag(tag: &str) -> Result<(), LedgerError> {
  let allowed = tag.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
  if tag.is_empty() || !allowed || tag.contains("..") || tag.starts_with('.') {
    return Err(LedgerError::InvalidTag(tag.to_string()));
  }
  Ok(())
}
