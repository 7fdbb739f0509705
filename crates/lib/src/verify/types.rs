//! Verification requests, outcomes and errors.

use std::path::PathBuf;

use alloy::primitives::{Address, Bytes};
use thiserror::Error;

use crate::artifact::{AbiError, Artifact, ArtifactError};
use crate::ledger::ChainId;

/// Everything an explorer needs to verify one deployment.
#[derive(Debug, Clone)]
pub struct VerifyRequest {
  pub name: String,
  pub address: Address,
  pub chain_id: ChainId,
  pub artifact: Artifact,
  /// ABI-encoded constructor arguments, without the creation code.
  pub constructor_args: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
  /// Accepted for processing; the explorer reports progress under `guid`.
  Submitted { guid: String },
  AlreadyVerified,
}

/// A deployment whose verification did not go through.
#[derive(Debug)]
pub struct VerificationFailed {
  pub name: String,
  pub cause: VerifyError,
}

/// Outcome of verifying a set of deployments.
#[derive(Debug, Default)]
pub struct VerifySummary {
  pub verified: Vec<(String, VerifyOutcome)>,
  pub failed: Vec<VerificationFailed>,
}

impl VerifySummary {
  pub fn is_clean(&self) -> bool {
    self.failed.is_empty()
  }
}

#[derive(Debug, Error)]
pub enum VerifyError {
  #[error("ledger record for '{0}' has no contract or args")]
  IncompleteRecord(String),

  #[error(transparent)]
  Artifact(#[from] ArtifactError),

  #[error("cannot encode constructor args: {0}")]
  Abi(#[from] AbiError),

  #[error("artifact for '{0}' carries no compiler metadata")]
  NoMetadata(String),

  #[error("failed to read source {path}: {source}")]
  Source {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("explorer request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("explorer rejected verification: {0}")]
  Rejected(String),

  #[error("no explorer configured for chain {0}")]
  NoExplorer(ChainId),

  #[error("explorer api key not set (export {0})")]
  NoApiKey(String),
}
