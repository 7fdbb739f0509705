//! Ledger storage backends.
//!
//! # Storage Layout
//!
//! ```text
//! {deployments_dir}/
//! ├── default.json        # ChainManifest for tag "default"
//! └── <tag>.json          # One manifest per tag
//! ```
//!
//! Every write rewrites the whole file through a temp file and a rename. There is
//! no locking: only one deployment invocation may target a (chain, tag) at a time.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::{ChainId, ChainManifest, DeploymentRecord, LedgerError, validate_tag};

/// Read/write access to deployment records.
///
/// Injected into the planner and executor instead of being read as ambient
/// global state.
pub trait Ledger {
  /// Look up a single record.
  fn get(&self, chain_id: ChainId, tag: &str, name: &str) -> Result<Option<DeploymentRecord>, LedgerError>;

  /// Insert or replace records, keyed by name.
  fn upsert(&mut self, chain_id: ChainId, tag: &str, records: &[DeploymentRecord]) -> Result<(), LedgerError>;

  /// All records for a chain and tag, in ledger order.
  fn all(&self, chain_id: ChainId, tag: &str) -> Result<Vec<DeploymentRecord>, LedgerError>;

  /// The full manifest for a tag.
  fn manifest(&self, tag: &str) -> Result<ChainManifest, LedgerError>;

  /// Chains with at least one record under a tag.
  fn chains(&self, tag: &str) -> Result<Vec<ChainId>, LedgerError> {
    Ok(self.manifest(tag)?.chain_ids())
  }
}

/// Ledger backed by one JSON file per tag.
#[derive(Debug, Clone)]
pub struct JsonLedger {
  base_path: PathBuf,
}

impl JsonLedger {
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  /// Path of the manifest file for a tag.
  pub fn manifest_path(&self, tag: &str) -> PathBuf {
    self.base_path.join(format!("{}.json", tag))
  }

  fn ensure_dir(&self) -> Result<(), LedgerError> {
    fs::create_dir_all(&self.base_path).map_err(LedgerError::CreateDir)
  }

  /// Load the manifest for a tag.
  ///
  /// A missing file is an empty manifest.
  pub fn load(&self, tag: &str) -> Result<ChainManifest, LedgerError> {
    validate_tag(tag)?;
    let path = self.manifest_path(tag);

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ChainManifest::new()),
      Err(source) => return Err(LedgerError::Read { path, source }),
    };

    serde_json::from_str(&content).map_err(|source| LedgerError::ManifestCorrupt { path, source })
  }

  /// Save the manifest for a tag (write to temp, then rename).
  pub fn save(&self, tag: &str, manifest: &ChainManifest) -> Result<(), LedgerError> {
    validate_tag(tag)?;
    self.ensure_dir()?;

    let path = self.manifest_path(tag);
    let temp_path = self.base_path.join(format!("{}.json.tmp", tag));

    let mut content = serde_json::to_string_pretty(manifest).map_err(LedgerError::Serialize)?;
    content.push('\n');
    fs::write(&temp_path, &content).map_err(|source| LedgerError::Write {
      path: temp_path.clone(),
      source,
    })?;
    fs::rename(&temp_path, &path).map_err(|source| LedgerError::Write { path, source })?;

    Ok(())
  }
}

impl Ledger for JsonLedger {
  fn get(&self, chain_id: ChainId, tag: &str, name: &str) -> Result<Option<DeploymentRecord>, LedgerError> {
    Ok(self.load(tag)?.get(chain_id, name).cloned())
  }

  fn upsert(&mut self, chain_id: ChainId, tag: &str, records: &[DeploymentRecord]) -> Result<(), LedgerError> {
    if records.is_empty() {
      return Ok(());
    }

    let mut manifest = self.load(tag)?;
    for record in records {
      manifest.upsert(chain_id, record.clone());
    }
    self.save(tag, &manifest)?;

    debug!(chain_id, tag, count = records.len(), path = %self.manifest_path(tag).display(), "ledger updated");
    Ok(())
  }

  fn all(&self, chain_id: ChainId, tag: &str) -> Result<Vec<DeploymentRecord>, LedgerError> {
    Ok(self.load(tag)?.records(chain_id).to_vec())
  }

  fn manifest(&self, tag: &str) -> Result<ChainManifest, LedgerError> {
    self.load(tag)
  }
}

/// In-memory ledger for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
  tags: HashMap<String, ChainManifest>,
  writes: usize,
}

impl MemoryLedger {
  pub fn new() -> Self {
    Self::default()
  }

  /// Seed a ledger from an existing manifest.
  pub fn with_manifest(tag: &str, manifest: ChainManifest) -> Self {
    let mut tags = HashMap::new();
    tags.insert(tag.to_string(), manifest);
    Self { tags, writes: 0 }
  }

  /// Number of `upsert` calls that changed state.
  pub fn writes(&self) -> usize {
    self.writes
  }
}

impl Ledger for MemoryLedger {
  fn get(&self, chain_id: ChainId, tag: &str, name: &str) -> Result<Option<DeploymentRecord>, LedgerError> {
    Ok(self.tags.get(tag).and_then(|m| m.get(chain_id, name)).cloned())
  }

  fn upsert(&mut self, chain_id: ChainId, tag: &str, records: &[DeploymentRecord]) -> Result<(), LedgerError> {
    if records.is_empty() {
      return Ok(());
    }
    let manifest = self.tags.entry(tag.to_string()).or_default();
    for record in records {
      manifest.upsert(chain_id, record.clone());
    }
    self.writes += 1;
    Ok(())
  }

  fn all(&self, chain_id: ChainId, tag: &str) -> Result<Vec<DeploymentRecord>, LedgerError> {
    Ok(
      self
        .tags
        .get(tag)
        .map(|m| m.records(chain_id).to_vec())
        .unwrap_or_default(),
    )
  }

  fn manifest(&self, tag: &str) -> Result<ChainManifest, LedgerError> {
    Ok(self.tags.get(tag).cloned().unwrap_or_default())
  }
}
