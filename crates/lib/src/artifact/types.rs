//! Compiled contract artifacts.

use std::path::PathBuf;
use std::str::FromStr;

use alloy::json_abi::JsonAbi;
use alloy::primitives::Bytes;
use serde_json::Value;
use thiserror::Error;

/// A compiled contract: ABI, creation bytecode and compiler metadata.
#[derive(Debug, Clone)]
pub struct Artifact {
  pub contract: String,
  pub abi: JsonAbi,
  /// Creation bytecode, without constructor arguments.
  pub bytecode: Bytes,
  /// Solidity compiler metadata, when the artifact carries it.
  pub metadata: Option<Value>,
  /// File the artifact was read from.
  pub path: Option<PathBuf>,
}

impl Artifact {
  /// Parse a Foundry (`bytecode.object`) or Hardhat (`bytecode` string) artifact.
  pub fn from_json(contract: &str, json: &Value) -> Result<Self, ArtifactError> {
    let invalid = |reason: String| ArtifactError::Invalid {
      contract: contract.to_string(),
      reason,
    };

    let abi_value = json.get("abi").cloned().ok_or_else(|| invalid("missing abi".into()))?;
    let abi: JsonAbi = serde_json::from_value(abi_value).map_err(|e| invalid(format!("bad abi: {e}")))?;

    let code = match json.get("bytecode") {
      Some(Value::String(code)) => code.as_str(),
      Some(Value::Object(obj)) => obj.get("object").and_then(Value::as_str).unwrap_or_default(),
      _ => "",
    };
    let code = code.trim();
    if code.is_empty() || code == "0x" {
      return Err(ArtifactError::NoBytecode(contract.to_string()));
    }
    if code.contains("__") {
      return Err(ArtifactError::UnlinkedLibraries(contract.to_string()));
    }
    let bytecode = Bytes::from_str(code).map_err(|e| invalid(format!("bad bytecode: {e}")))?;

    let metadata = match (json.get("metadata"), json.get("rawMetadata")) {
      (Some(Value::Object(obj)), _) => Some(Value::Object(obj.clone())),
      (Some(Value::String(raw)), _) | (_, Some(Value::String(raw))) => serde_json::from_str(raw).ok(),
      _ => None,
    };

    Ok(Self {
      contract: contract.to_string(),
      abi,
      bytecode,
      metadata,
      path: None,
    })
  }

  /// Compiler version from metadata, e.g. `0.8.22+commit.4fc1097e`.
  pub fn compiler_version(&self) -> Option<&str> {
    self.metadata.as_ref()?.pointer("/compiler/version")?.as_str()
  }

  /// Source path and contract name this artifact was compiled from.
  pub fn compilation_target(&self) -> Option<(String, String)> {
    let target = self.metadata.as_ref()?.pointer("/settings/compilationTarget")?.as_object()?;
    let (path, name) = target.iter().next()?;
    Some((path.clone(), name.as_str()?.to_string()))
  }

  /// `path/To.sol:Contract`, the name explorers expect.
  pub fn fully_qualified_name(&self) -> Option<String> {
    self.compilation_target().map(|(path, name)| format!("{path}:{name}"))
  }
}

/// Errors loading artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
  #[error("no artifact found for '{contract}' under {root}")]
  NotFound { contract: String, root: PathBuf },

  #[error("failed to read artifact {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid artifact for '{contract}': {reason}")]
  Invalid { contract: String, reason: String },

  #[error("'{0}' has no creation bytecode (abstract contract or interface?)")]
  NoBytecode(String),

  #[error("'{0}' has unlinked library references")]
  UnlinkedLibraries(String),
}

/// Errors encoding calls against an ABI.
#[derive(Debug, Error)]
pub enum AbiError {
  #[error("no function '{0}' in abi")]
  UnknownFunction(String),

  #[error("'{name}' is overloaded; use the full signature (one of: {candidates})")]
  Ambiguous { name: String, candidates: String },

  #[error("expected {expected} arguments, got {got}")]
  ArgCount { expected: usize, got: usize },

  #[error("argument '{param}': {reason}")]
  Coerce { param: String, reason: String },

  #[error("encoding failed: {0}")]
  Encode(String),
}
