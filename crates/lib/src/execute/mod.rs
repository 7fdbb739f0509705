//! Plan execution.
//!
//! Batches run strictly in order. Within a batch, deployments are independent
//! and are submitted concurrently up to `parallelism`. After every batch the
//! confirmed deployments are written to the ledger, so an interrupted run keeps
//! everything that was confirmed.
//!
//! Execution is fail-fast: once a deployment fails, nothing else in its batch
//! is submitted and no later batch starts.

mod deploy;
mod types;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use alloy::primitives::{Address, Bytes};
use futures::future::join_all;
use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

pub use deploy::{DeployResult, deploy};
pub use types::{DeployError, ExecuteConfig, ExecuteError, ExecuteReport};

use crate::artifact::{ArtifactSource, encode_constructor};
use crate::descriptor::BuildDescriptor;
use crate::ledger::{DeploymentRecord, Ledger};
use crate::plan::ExecutionPlan;
use crate::submit::{Deployed, TransactionSubmitter};

/// What execution needs besides the plan and the ledger.
pub struct ExecuteContext<'a, S, A> {
  pub submitter: &'a S,
  pub artifacts: &'a A,
  pub config: ExecuteConfig,
}

/// A descriptor with its arguments resolved and creation code built.
struct Prepared<'d> {
  descriptor: &'d BuildDescriptor,
  args: Vec<Value>,
  init_code: Bytes,
  references: Vec<(String, Address)>,
}

impl Prepared<'_> {
  /// Ledger record for a confirmed deployment.
  ///
  /// Meta order: contract, args, txHash, substituted references, then the
  /// descriptor's own meta.
  fn into_record(self, deployed: Deployed) -> DeploymentRecord {
    let mut meta = Map::new();
    meta.insert("contract".into(), Value::String(self.descriptor.contract.clone()));
    meta.insert("args".into(), Value::Array(self.args));
    meta.insert("txHash".into(), Value::String(deployed.tx_hash.to_string()));
    for (key, address) in self.references {
      meta.insert(key, Value::String(address.to_checksum(None)));
    }
    for (key, value) in &self.descriptor.meta {
      meta.insert(key.clone(), value.clone());
    }

    DeploymentRecord {
      name: self.descriptor.deployment_name.clone(),
      address: deployed.address,
      meta,
    }
  }
}

fn prepare<'d, A: ArtifactSource>(
  descriptor: &'d BuildDescriptor,
  addresses: &HashMap<String, Address>,
  artifacts: &A,
) -> Result<Prepared<'d>, ExecuteError> {
  let args = descriptor.resolve_args(addresses)?;
  let artifact = artifacts.load(&descriptor.contract)?;
  let init_code = encode_constructor(&artifact, &args).map_err(|source| ExecuteError::Encode {
    name: descriptor.deployment_name.clone(),
    source,
  })?;

  let references = descriptor
    .dependency_refs()
    .iter()
    .filter_map(|r| addresses.get(&r.deployment_name).map(|a| (r.meta_key().to_string(), *a)))
    .collect();

  Ok(Prepared {
    descriptor,
    args,
    init_code,
    references,
  })
}

/// Execute a plan, recording confirmed deployments in the ledger.
///
/// # Errors
///
/// - `TransactionFailed` when a deployment fails; confirmed deployments of the
///   same batch and all earlier batches are already in the ledger
/// - `Artifact` / `Encode` / `Descriptor` when a batch cannot be prepared;
///   nothing of that batch is submitted
/// - `Ledger` when recording fails
pub async fn execute_plan<S, A, L>(
  plan: &ExecutionPlan,
  ctx: &ExecuteContext<'_, S, A>,
  ledger: &mut L,
) -> Result<ExecuteReport, ExecuteError>
where
  S: TransactionSubmitter,
  A: ArtifactSource,
  L: Ledger,
{
  let chain_id = ctx.submitter.chain_id();
  let tag = ctx.config.tag.as_str();
  let semaphore = Semaphore::new(ctx.config.parallelism.max(1));
  let mut addresses = plan.known_addresses();
  let mut report = ExecuteReport::default();

  info!(
    chain_id,
    tag,
    batches = plan.batches.len(),
    deployments = plan.deployment_count(),
    "executing plan"
  );

  for (index, batch) in plan.batches.iter().enumerate() {
    debug!(batch = index, size = batch.len(), "executing batch");

    let prepared = batch
      .iter()
      .map(|descriptor| prepare(descriptor, &addresses, ctx.artifacts))
      .collect::<Result<Vec<_>, _>>()?;

    let failed = AtomicBool::new(false);
    let outcomes = join_all(prepared.iter().map(|item| {
      let semaphore = &semaphore;
      let failed = &failed;
      async move {
        let _permit = semaphore.acquire().await;
        if failed.load(Ordering::SeqCst) {
          return None;
        }
        let result = ctx
          .submitter
          .deploy(&item.descriptor.deployment_name, item.init_code.clone())
          .await;
        if result.is_err() {
          failed.store(true, Ordering::SeqCst);
        }
        Some(result)
      }
    }))
    .await;

    let mut records = Vec::new();
    let mut failure = None;
    for (item, outcome) in prepared.into_iter().zip(outcomes) {
      let name = item.descriptor.deployment_name.clone();
      match outcome {
        Some(Ok(deployed)) => {
          info!(deployment = %name, address = %deployed.address, tx = %deployed.tx_hash, "deployed");
          records.push(item.into_record(deployed));
        }
        Some(Err(source)) => {
          error!(deployment = %name, error = %source, "deployment failed");
          if failure.is_none() {
            failure = Some(ExecuteError::TransactionFailed { name, source });
          }
        }
        None => debug!(deployment = %name, "not submitted after failure in batch"),
      }
    }

    for record in &records {
      addresses.insert(record.name.clone(), record.address);
    }
    ledger.upsert(chain_id, tag, &records)?;
    report.deployed.extend(records);

    if let Some(err) = failure {
      return Err(err);
    }
    report.batches += 1;
  }

  info!(deployed = report.deployed.len(), "plan executed");
  Ok(report)
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use serde_json::json;

  use super::*;
  use crate::descriptor::Arg;
  use crate::ledger::MemoryLedger;
  use crate::plan::{ExistingPolicy, resolve_plan};
  use crate::util::testutil::{MockSubmitter, artifacts};

  const CHAIN: u64 = 421614;
  const ASSET: &str = "0x00000000000000000000000000000000000000e2";

  fn context<'a>(
    submitter: &'a MockSubmitter,
    artifacts: &'a crate::artifact::StaticArtifacts,
    parallelism: usize,
  ) -> ExecuteContext<'a, MockSubmitter, crate::artifact::StaticArtifacts> {
    ExecuteContext {
      submitter,
      artifacts,
      config: ExecuteConfig {
        tag: "test".into(),
        parallelism,
      },
    }
  }

  fn vault_and_token() -> Vec<BuildDescriptor> {
    vec![
      BuildDescriptor::new("Vault", "YieldBox").arg(Arg::literal(ASSET)),
      BuildDescriptor::new("Token", "TOFT").arg(Arg::structure([
        ("vault", Arg::reference("Vault")),
        ("fee", Arg::literal(5)),
      ])),
    ]
  }

  #[tokio::test]
  async fn substitutes_addresses_and_records_meta() {
    let submitter = MockSubmitter::new(CHAIN);
    let artifacts = artifacts();
    let mut ledger = MemoryLedger::new();

    let plan = resolve_plan(&vault_and_token(), &[], ExistingPolicy::Skip).unwrap();
    let report = execute_plan(&plan, &context(&submitter, &artifacts, 1), &mut ledger)
      .await
      .unwrap();

    assert_eq!(report.batches, 2);
    assert_eq!(submitter.deployed_names(), vec!["Vault", "Token"]);

    let vault = ledger.get(CHAIN, "test", "Vault").unwrap().unwrap();
    let token = ledger.get(CHAIN, "test", "Token").unwrap().unwrap();
    assert_eq!(vault.address, MockSubmitter::address_for("Vault", 0));
    assert_eq!(token.meta["vault"], json!(vault.address.to_checksum(None)));
    assert_eq!(token.meta["args"], json!([{ "vault": vault.address.to_checksum(None), "fee": 5 }]));

    let keys: Vec<_> = token.meta.keys().cloned().collect();
    assert_eq!(keys, vec!["contract", "args", "txHash", "vault"]);

    let init_code = submitter.init_code("Token").unwrap();
    assert_eq!(&init_code[2 + 12..2 + 32], vault.address.as_slice());
  }

  #[tokio::test]
  async fn descriptor_meta_follows_generated_keys() {
    let submitter = MockSubmitter::new(CHAIN);
    let artifacts = artifacts();
    let mut ledger = MemoryLedger::new();

    let mut descriptor = BuildDescriptor::new("A", "A");
    descriptor.meta.insert("note".into(), json!("first"));
    let plan = resolve_plan(&[descriptor], &[], ExistingPolicy::Skip).unwrap();
    execute_plan(&plan, &context(&submitter, &artifacts, 1), &mut ledger)
      .await
      .unwrap();

    let record = ledger.get(CHAIN, "test", "A").unwrap().unwrap();
    let keys: Vec<_> = record.meta.keys().cloned().collect();
    assert_eq!(keys, vec!["contract", "args", "txHash", "note"]);
  }

  #[tokio::test]
  async fn failure_stops_later_batches_and_keeps_earlier() {
    let submitter = MockSubmitter::new(CHAIN).fail_on("Token");
    let artifacts = artifacts();
    let mut ledger = MemoryLedger::new();

    let mut descriptors = vault_and_token();
    descriptors.push(BuildDescriptor::new("After", "A").after("Token"));
    let plan = resolve_plan(&descriptors, &[], ExistingPolicy::Skip).unwrap();

    let err = execute_plan(&plan, &context(&submitter, &artifacts, 1), &mut ledger)
      .await
      .unwrap_err();

    assert!(matches!(err, ExecuteError::TransactionFailed { ref name, .. } if name == "Token"));
    assert!(ledger.get(CHAIN, "test", "Vault").unwrap().is_some());
    assert!(ledger.get(CHAIN, "test", "Token").unwrap().is_none());
    assert_eq!(submitter.deployed_names(), vec!["Vault"]);
  }

  #[tokio::test]
  async fn confirmed_items_of_failing_batch_are_recorded() {
    let submitter = MockSubmitter::new(CHAIN).fail_on("C");
    let artifacts = artifacts();
    let mut ledger = MemoryLedger::new();

    let descriptors = vec![
      BuildDescriptor::new("A", "A"),
      BuildDescriptor::new("B", "B"),
      BuildDescriptor::new("C", "C"),
      BuildDescriptor::new("D", "D"),
    ];
    let plan = resolve_plan(&descriptors, &[], ExistingPolicy::Skip).unwrap();
    assert_eq!(plan.batches.len(), 1);

    let err = execute_plan(&plan, &context(&submitter, &artifacts, 1), &mut ledger)
      .await
      .unwrap_err();

    assert!(matches!(err, ExecuteError::TransactionFailed { .. }));
    let recorded: Vec<_> = ledger.all(CHAIN, "test").unwrap().into_iter().map(|r| r.name).collect();
    assert_eq!(recorded, vec!["A", "B"]);
    // D is never submitted once C fails.
    assert_eq!(submitter.deployed_names(), vec!["A", "B"]);
  }

  #[tokio::test]
  async fn parallelism_bounds_in_flight() {
    let artifacts = artifacts();
    let descriptors: Vec<_> = ["A", "B", "C", "D", "E"]
      .iter()
      .map(|n| BuildDescriptor::new(*n, *n))
      .collect();
    let plan = resolve_plan(&descriptors, &[], ExistingPolicy::Skip).unwrap();

    let sequential = MockSubmitter::new(CHAIN).with_delay(Duration::from_millis(5));
    execute_plan(&plan, &context(&sequential, &artifacts, 1), &mut MemoryLedger::new())
      .await
      .unwrap();
    assert_eq!(sequential.max_in_flight(), 1);

    let parallel = MockSubmitter::new(CHAIN).with_delay(Duration::from_millis(5));
    execute_plan(&plan, &context(&parallel, &artifacts, 2), &mut MemoryLedger::new())
      .await
      .unwrap();
    assert_eq!(parallel.max_in_flight(), 2);
  }

  #[tokio::test]
  async fn uses_known_addresses_for_external_refs() {
    let submitter = MockSubmitter::new(CHAIN);
    let artifacts = artifacts();
    let existing = DeploymentRecord::new("Vault", Address::repeat_byte(0x77));
    let mut ledger = MemoryLedger::new();

    let descriptors = vec![
      BuildDescriptor::new("Token", "TOFT").arg(Arg::structure([
        ("vault", Arg::reference("Vault")),
        ("fee", Arg::literal(1)),
      ])),
    ];
    let plan = resolve_plan(&descriptors, &[existing], ExistingPolicy::Skip).unwrap();
    execute_plan(&plan, &context(&submitter, &artifacts, 1), &mut ledger)
      .await
      .unwrap();

    let token = ledger.get(CHAIN, "test", "Token").unwrap().unwrap();
    assert_eq!(token.meta["vault"], json!(Address::repeat_byte(0x77).to_checksum(None)));
  }

  #[tokio::test]
  async fn encode_errors_submit_nothing() {
    let submitter = MockSubmitter::new(CHAIN);
    let artifacts = artifacts();
    let mut ledger = MemoryLedger::new();

    // YieldBox expects one address.
    let descriptors = vec![BuildDescriptor::new("Vault", "YieldBox").arg(Arg::literal(1)).arg(Arg::literal(2))];
    let plan = resolve_plan(&descriptors, &[], ExistingPolicy::Skip).unwrap();
    let err = execute_plan(&plan, &context(&submitter, &artifacts, 1), &mut ledger)
      .await
      .unwrap_err();

    assert!(matches!(err, ExecuteError::Encode { .. }));
    assert_eq!(submitter.transaction_count(), 0);
    assert_eq!(ledger.writes(), 0);
  }
}
