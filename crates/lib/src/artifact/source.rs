//! Where artifacts come from.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;
use walkdir::WalkDir;

use super::types::{Artifact, ArtifactError};

/// Loads compiled artifacts by contract name.
pub trait ArtifactSource {
  fn load(&self, contract: &str) -> Result<Artifact, ArtifactError>;
}

/// Artifacts from a Foundry `out/` or Hardhat `artifacts/` tree.
///
/// Looks for `<root>/<C>.sol/<C>.json` first, then searches the tree for the
/// first `<C>.json`. `build-info` directories are skipped.
#[derive(Debug, Clone)]
pub struct FoundryArtifacts {
  root: PathBuf,
}

impl FoundryArtifacts {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn locate(&self, contract: &str) -> Option<PathBuf> {
    let file_name = format!("{contract}.json");

    let primary = self.root.join(format!("{contract}.sol")).join(&file_name);
    if primary.is_file() {
      return Some(primary);
    }

    WalkDir::new(&self.root)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|e| e.file_name() != "build-info")
      .filter_map(Result::ok)
      .find(|e| e.file_type().is_file() && e.file_name().to_str() == Some(file_name.as_str()))
      .map(|e| e.into_path())
  }
}

impl ArtifactSource for FoundryArtifacts {
  fn load(&self, contract: &str) -> Result<Artifact, ArtifactError> {
    let path = self.locate(contract).ok_or_else(|| ArtifactError::NotFound {
      contract: contract.to_string(),
      root: self.root.clone(),
    })?;
    trace!(contract, path = %path.display(), "loading artifact");

    let content = fs::read_to_string(&path).map_err(|source| ArtifactError::Read {
      path: path.clone(),
      source,
    })?;
    let json = serde_json::from_str(&content).map_err(|e| ArtifactError::Invalid {
      contract: contract.to_string(),
      reason: e.to_string(),
    })?;

    let mut artifact = Artifact::from_json(contract, &json)?;
    artifact.path = Some(path);
    Ok(artifact)
  }
}

/// A fixed set of artifacts held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticArtifacts {
  artifacts: HashMap<String, Artifact>,
}

impl StaticArtifacts {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, artifact: Artifact) -> Self {
    self.insert(artifact);
    self
  }

  pub fn insert(&mut self, artifact: Artifact) {
    self.artifacts.insert(artifact.contract.clone(), artifact);
  }
}

impl ArtifactSource for StaticArtifacts {
  fn load(&self, contract: &str) -> Result<Artifact, ArtifactError> {
    self
      .artifacts
      .get(contract)
      .cloned()
      .ok_or_else(|| ArtifactError::NotFound {
        contract: contract.to_string(),
        root: PathBuf::from("<memory>"),
      })
  }
}
