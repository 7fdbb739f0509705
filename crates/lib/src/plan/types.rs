//! Types for deployment planning.

use std::collections::HashMap;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::BuildDescriptor;
use crate::ledger::DeploymentRecord;

/// What to do with descriptors whose name already has a ledger record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingPolicy {
  /// Keep the existing deployment; the record satisfies dependents.
  #[default]
  Skip,
  /// Redeploy and replace the record; dependents use the new address.
  Overwrite,
}

/// A group of deployments with no dependencies on each other.
pub type Batch = Vec<BuildDescriptor>;

/// The result of planning: what to deploy, in which order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
  /// Batches in execution order.
  pub batches: Vec<Batch>,
  /// Descriptors left out because they are already deployed.
  pub skipped: Vec<DeploymentRecord>,
  /// Ledger records referenced by the plan but not part of the descriptor set.
  pub external: Vec<DeploymentRecord>,
}

impl ExecutionPlan {
  /// Number of deployments the plan will perform.
  pub fn deployment_count(&self) -> usize {
    self.batches.iter().map(Vec::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.batches.is_empty()
  }

  /// Addresses known before execution starts.
  pub fn known_addresses(&self) -> HashMap<String, Address> {
    self
      .external
      .iter()
      .chain(&self.skipped)
      .map(|record| (record.name.clone(), record.address))
      .collect()
  }

  /// Names per batch.
  pub fn batch_names(&self) -> Vec<Vec<&str>> {
    self
      .batches
      .iter()
      .map(|batch| batch.iter().map(|d| d.deployment_name.as_str()).collect())
      .collect()
  }
}

/// Errors that make a descriptor set unplannable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
  #[error("deployment '{0}' is declared more than once")]
  DuplicateDeployment(String),

  #[error("'{required_by}' depends on '{name}', which is neither in the group nor deployed")]
  UnresolvedDependency { name: String, required_by: String },

  #[error("dependency cycle between: {}", .0.join(", "))]
  CyclicDependency(Vec<String>),

  #[error("'{name}' would record meta key '{key}' from more than one source")]
  MetaKeyConflict { name: String, key: String },
}
