//! Types for plan execution.
//!
//! This module defines the configuration, report and error types for
//! executing an [`ExecutionPlan`](crate::plan::ExecutionPlan) against a chain.

use thiserror::Error;

use crate::artifact::{AbiError, ArtifactError};
use crate::descriptor::DescriptorError;
use crate::ledger::{DeploymentRecord, LedgerError};
use crate::plan::PlanError;
use crate::prompt::PromptError;
use crate::submit::SubmitError;

/// Configuration for plan execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Ledger tag the records are written under.
  pub tag: String,

  /// Maximum number of deployments of one batch in flight at once.
  pub parallelism: usize,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      tag: crate::consts::DEFAULT_TAG.to_string(),
      parallelism: 1,
    }
  }
}

/// What an execution did.
#[derive(Debug, Clone, Default)]
pub struct ExecuteReport {
  /// Records written to the ledger, in confirmation order per batch.
  pub deployed: Vec<DeploymentRecord>,

  /// Number of batches that completed.
  pub batches: usize,
}

impl ExecuteReport {
  pub fn is_empty(&self) -> bool {
    self.deployed.is_empty()
  }
}

/// Errors that can occur during execution.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// A deployment transaction failed. Earlier confirmations are recorded.
  #[error("deployment of '{name}' failed: {source}")]
  TransactionFailed {
    name: String,
    #[source]
    source: SubmitError,
  },

  #[error("artifact error: {0}")]
  Artifact(#[from] ArtifactError),

  /// Constructor arguments do not fit the artifact's ABI.
  #[error("cannot encode constructor args for '{name}': {source}")]
  Encode {
    name: String,
    #[source]
    source: AbiError,
  },

  /// An argument still holds a reference or prompt at execution time.
  #[error(transparent)]
  Descriptor(#[from] DescriptorError),

  #[error("ledger error: {0}")]
  Ledger(#[from] LedgerError),
}

/// Errors from the full deploy flow: prompts, planning and execution.
#[derive(Debug, Error)]
pub enum DeployError {
  #[error(transparent)]
  Prompt(#[from] PromptError),

  #[error(transparent)]
  Plan(#[from] PlanError),

  #[error(transparent)]
  Ledger(#[from] LedgerError),

  #[error(transparent)]
  Execute(#[from] ExecuteError),
}
