//! Dependency resolution: descriptors to ordered batches.
//!
//! [`resolve_plan`] is pure. It checks the descriptor set against the ledger
//! records of the target chain, applies the [`ExistingPolicy`] and orders what
//! remains into batches.

mod dag;
mod types;

use std::collections::{HashMap, HashSet};

use tracing::debug;

pub use dag::DeploymentDag;
pub use types::{Batch, ExecutionPlan, ExistingPolicy, PlanError};

use crate::descriptor::BuildDescriptor;
use crate::ledger::DeploymentRecord;

/// Order descriptors into batches.
///
/// # Errors
///
/// - `DuplicateDeployment` if two descriptors share a name
/// - `UnresolvedDependency` if any descriptor, skipped or not, depends on a
///   name that is neither in the set nor in `existing`
/// - `CyclicDependency` listing every descriptor on a cycle
/// - `MetaKeyConflict` if a descriptor's record meta would have a key written twice
pub fn resolve_plan(
  descriptors: &[BuildDescriptor],
  existing: &[DeploymentRecord],
  policy: ExistingPolicy,
) -> Result<ExecutionPlan, PlanError> {
  let mut declared: HashSet<&str> = HashSet::new();
  for descriptor in descriptors {
    if !declared.insert(descriptor.deployment_name.as_str()) {
      return Err(PlanError::DuplicateDeployment(descriptor.deployment_name.clone()));
    }
    if let Some(key) = descriptor.conflicting_meta_key() {
      return Err(PlanError::MetaKeyConflict {
        name: descriptor.deployment_name.clone(),
        key,
      });
    }
  }

  let existing: HashMap<&str, &DeploymentRecord> = existing.iter().map(|r| (r.name.as_str(), r)).collect();

  let (planned, skipped): (Vec<&BuildDescriptor>, Vec<&BuildDescriptor>) = descriptors
    .iter()
    .partition(|d| policy == ExistingPolicy::Overwrite || !existing.contains_key(d.deployment_name.as_str()));

  let mut external: Vec<DeploymentRecord> = Vec::new();
  for descriptor in descriptors {
    let is_planned = planned.iter().any(|d| std::ptr::eq(*d, descriptor));
    for dependency in descriptor.dependencies() {
      if declared.contains(dependency.as_str()) {
        continue;
      }
      match existing.get(dependency.as_str()) {
        Some(record) => {
          if is_planned && !external.iter().any(|r| r.name == record.name) {
            external.push((*record).clone());
          }
        }
        None => {
          return Err(PlanError::UnresolvedDependency {
            name: dependency,
            required_by: descriptor.deployment_name.clone(),
          });
        }
      }
    }
  }

  let all: Vec<&BuildDescriptor> = descriptors.iter().collect();
  let cycle = DeploymentDag::new(&all).cycle_members();
  if !cycle.is_empty() {
    return Err(PlanError::CyclicDependency(
      cycle.into_iter().map(|d| d.deployment_name.clone()).collect(),
    ));
  }

  let layers = DeploymentDag::new(&planned).layers().ok_or_else(|| {
    // Unreachable after the full-set cycle check; a subgraph of a DAG is acyclic.
    PlanError::CyclicDependency(planned.iter().map(|d| d.deployment_name.clone()).collect())
  })?;

  let plan = ExecutionPlan {
    batches: layers
      .into_iter()
      .map(|layer| layer.into_iter().cloned().collect())
      .collect(),
    skipped: skipped
      .iter()
      .filter_map(|d| existing.get(d.deployment_name.as_str()).map(|r| (*r).clone()))
      .collect(),
    external,
  };

  debug!(
    batches = plan.batches.len(),
    deployments = plan.deployment_count(),
    skipped = plan.skipped.len(),
    external = plan.external.len(),
    "plan resolved"
  );

  Ok(plan)
}
