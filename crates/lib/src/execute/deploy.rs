//! Deploy orchestration.
//!
//! Ties the pieces together for one invocation:
//!
//! 1. Read the ledger for the target chain and tag
//! 2. Plan the descriptors against it
//! 3. Answer prompts of the descriptors that will actually be deployed
//! 4. Execute the plan
//!
//! Verification is a separate, best-effort step run by the caller afterwards.

use tracing::info;

use crate::artifact::ArtifactSource;
use crate::descriptor::BuildDescriptor;
use crate::ledger::Ledger;
use crate::plan::{ExecutionPlan, ExistingPolicy, resolve_plan};
use crate::prompt::{ParameterSource, resolve_prompts};
use crate::submit::TransactionSubmitter;

use super::types::{DeployError, ExecuteReport};
use super::{ExecuteContext, execute_plan};

/// Result of a deploy.
#[derive(Debug)]
pub struct DeployResult {
  /// The plan that was executed, with prompts answered.
  pub plan: ExecutionPlan,
  pub report: ExecuteReport,
}

/// Plan and execute `descriptors` on the submitter's chain.
///
/// A cycle or unresolved dependency fails before anything is prompted or
/// submitted. Re-running a complete deployment with [`ExistingPolicy::Skip`]
/// submits nothing and leaves the ledger untouched.
pub async fn deploy<S, A, L>(
  descriptors: &[BuildDescriptor],
  params: &dyn ParameterSource,
  ctx: &ExecuteContext<'_, S, A>,
  ledger: &mut L,
  policy: ExistingPolicy,
) -> Result<DeployResult, DeployError>
where
  S: TransactionSubmitter,
  A: ArtifactSource,
  L: Ledger,
{
  let chain_id = ctx.submitter.chain_id();
  let existing = ledger.all(chain_id, &ctx.config.tag)?;

  let mut plan = resolve_plan(descriptors, &existing, policy)?;
  resolve_prompts(plan.batches.iter_mut().flatten(), params)?;

  if plan.is_empty() {
    info!(chain_id, tag = %ctx.config.tag, skipped = plan.skipped.len(), "nothing to deploy");
    return Ok(DeployResult {
      plan,
      report: ExecuteReport::default(),
    });
  }

  let report = execute_plan(&plan, ctx, ledger).await?;
  Ok(DeployResult { plan, report })
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::artifact::StaticArtifacts;
  use crate::descriptor::Arg;
  use crate::execute::ExecuteConfig;
  use crate::ledger::{DeploymentRecord, MemoryLedger};
  use crate::plan::PlanError;
  use crate::prompt::{CannedParameters, PromptSpec, ValueKind};
  use crate::util::testutil::{MockSubmitter, artifact, artifacts};

  const CHAIN: u64 = 10;
  const OWNER: &str = "0x00000000000000000000000000000000000000aa";

  fn ctx<'a>(submitter: &'a MockSubmitter, artifacts: &'a StaticArtifacts) -> ExecuteContext<'a, MockSubmitter, StaticArtifacts> {
    ExecuteContext {
      submitter,
      artifacts,
      config: ExecuteConfig {
        tag: "default".into(),
        parallelism: 1,
      },
    }
  }

  fn group() -> Vec<BuildDescriptor> {
    vec![
      BuildDescriptor::new("Vault", "YieldBox").arg(Arg::Prompt(PromptSpec::new("asset", ValueKind::Address))),
      BuildDescriptor::new("Token", "TOFT").arg(Arg::structure([
        ("vault", Arg::reference("Vault")),
        ("fee", Arg::literal(5)),
      ])),
    ]
  }

  #[tokio::test]
  async fn cycle_deploys_nothing() {
    let submitter = MockSubmitter::new(CHAIN);
    let artifacts = artifacts();
    let mut ledger = MemoryLedger::new();

    let descriptors = vec![
      BuildDescriptor::new("A", "A").after("B"),
      BuildDescriptor::new("B", "B").arg(Arg::reference("A")),
    ];
    let err = deploy(&descriptors, &CannedParameters::new(), &ctx(&submitter, &artifacts), &mut ledger, ExistingPolicy::Skip)
      .await
      .unwrap_err();

    assert!(matches!(err, DeployError::Plan(PlanError::CyclicDependency(ref names)) if names == &["A", "B"]));
    assert_eq!(submitter.transaction_count(), 0);
    assert_eq!(ledger.writes(), 0);
  }

  #[tokio::test]
  async fn rerun_with_skip_is_a_no_op() {
    let submitter = MockSubmitter::new(CHAIN);
    let artifacts = artifacts();
    let mut ledger = MemoryLedger::new();
    let params = CannedParameters::new().with("asset", OWNER);

    deploy(&group(), &params, &ctx(&submitter, &artifacts), &mut ledger, ExistingPolicy::Skip)
      .await
      .unwrap();
    let before = ledger.manifest("default").unwrap();
    let writes = ledger.writes();

    // No params: the only prompt belongs to an already-deployed descriptor.
    let result = deploy(&group(), &CannedParameters::new(), &ctx(&submitter, &artifacts), &mut ledger, ExistingPolicy::Skip)
      .await
      .unwrap();

    assert!(result.report.is_empty());
    assert_eq!(result.plan.skipped.len(), 2);
    assert_eq!(submitter.transaction_count(), 2);
    assert_eq!(ledger.writes(), writes);
    assert_eq!(ledger.manifest("default").unwrap(), before);
  }

  #[tokio::test]
  async fn overwrite_replaces_records() {
    let submitter = MockSubmitter::new(CHAIN);
    let artifacts = artifacts();
    let params = CannedParameters::new().with("asset", OWNER);
    let mut ledger = MemoryLedger::new();

    deploy(&group(), &params, &ctx(&submitter, &artifacts), &mut ledger, ExistingPolicy::Skip)
      .await
      .unwrap();
    let first_vault = ledger.get(CHAIN, "default", "Vault").unwrap().unwrap().address;

    deploy(&group(), &params, &ctx(&submitter, &artifacts), &mut ledger, ExistingPolicy::Overwrite)
      .await
      .unwrap();

    let records = ledger.all(CHAIN, "default").unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(submitter.transaction_count(), 4);

    let vault = ledger.get(CHAIN, "default", "Vault").unwrap().unwrap();
    let token = ledger.get(CHAIN, "default", "Token").unwrap().unwrap();
    assert_ne!(vault.address, first_vault);
    assert_eq!(vault.address, MockSubmitter::address_for("Vault", 2));
    assert_eq!(token.meta["vault"], json!(vault.address.to_checksum(None)));
  }

  #[tokio::test]
  async fn manifest_only_reference_deploys_in_first_batch() {
    let submitter = MockSubmitter::new(CHAIN);
    let artifacts = StaticArtifacts::new().with(artifact("Strategy", &[("cluster", "address")]));
    let cluster = DeploymentRecord::new("Cluster", alloy::primitives::Address::repeat_byte(0xc1));
    let mut ledger = MemoryLedger::new();
    ledger.upsert(CHAIN, "default", &[cluster.clone()]).unwrap();

    let descriptors = vec![BuildDescriptor::new("Strategy", "Strategy").arg(Arg::reference("Cluster"))];
    let result = deploy(&descriptors, &CannedParameters::new(), &ctx(&submitter, &artifacts), &mut ledger, ExistingPolicy::Skip)
      .await
      .unwrap();

    assert_eq!(result.plan.batch_names(), vec![vec!["Strategy"]]);
    assert_eq!(result.plan.external, vec![cluster.clone()]);
    let strategy = ledger.get(CHAIN, "default", "Strategy").unwrap().unwrap();
    assert_eq!(strategy.meta["Cluster"], json!(cluster.address.to_checksum(None)));
  }

  #[tokio::test]
  async fn missing_prompt_fails_before_submitting() {
    let submitter = MockSubmitter::new(CHAIN);
    let artifacts = artifacts();
    let mut ledger = MemoryLedger::new();

    let err = deploy(&group(), &CannedParameters::new(), &ctx(&submitter, &artifacts), &mut ledger, ExistingPolicy::Skip)
      .await
      .unwrap_err();

    assert!(matches!(err, DeployError::Prompt(_)));
    assert_eq!(submitter.transaction_count(), 0);
  }
}
