//! Implementation of the `deployer deploy` command.
//!
//! Plans a group, answers its prompts, deploys batch by batch and, unless told
//! otherwise, submits the new deployments for verification. Planning and
//! prompting happen before connecting, so an unplannable group fails without
//! network access.

use anyhow::{Context, Result};
use tracing::info;

use deployer_lib::artifact::FoundryArtifacts;
use deployer_lib::config::NetworkConfig;
use deployer_lib::execute::{ExecuteConfig, ExecuteContext, deploy};
use deployer_lib::ledger::{ChainId, DeploymentRecord, Ledger};
use deployer_lib::plan::{ExecutionPlan, ExistingPolicy};
use deployer_lib::prompt::{CannedParameters, Layered, resolve_prompts};
use deployer_lib::verify::{EtherscanVerifier, verify_deployments};

use super::plan::load_plan;
use super::{Project, SignerArgs, connect, runtime};
use crate::output::{print_info, print_stat, print_success, print_warning};
use crate::prompts::{TerminalPrompt, confirm};

pub struct DeployOptions {
  pub overwrite: bool,
  pub params: Vec<String>,
  pub no_verify: bool,
  pub parallelism: usize,
  pub yes: bool,
  pub signer: SignerArgs,
}

pub fn cmd_deploy(project: &Project, group: &str, opts: DeployOptions) -> Result<()> {
  let policy = if opts.overwrite {
    ExistingPolicy::Overwrite
  } else {
    ExistingPolicy::Skip
  };
  let (chain_id, mut plan) = load_plan(project, group, policy)?;

  print_stat("Network", &project.network_label(chain_id));
  print_stat("Tag", &project.tag);

  if plan.is_empty() {
    print_info(&format!("Nothing to deploy ({} already deployed)", plan.skipped.len()));
    return Ok(());
  }

  if opts.overwrite {
    let replaced = replaced_names(project, chain_id, &plan)?;
    if !replaced.is_empty() && !confirm(&format!("Redeploy and replace {}?", replaced.join(", ")), opts.yes)? {
      print_info("Aborted");
      return Ok(());
    }
  }

  // Ask everything up front; execution then reads the answers back.
  let source = Layered::new()
    .push(CannedParameters::from_pairs(&opts.params)?)
    .push(TerminalPrompt);
  let answers = resolve_prompts(plan.batches.iter_mut().flatten(), &source)?;
  let answers = answers
    .into_iter()
    .fold(CannedParameters::new(), |params, (key, value)| params.with(key, value));

  let rt = runtime()?;
  rt.block_on(execute(project, group, &answers, policy, &opts))
}

async fn execute(
  project: &Project,
  group: &str,
  answers: &CannedParameters,
  policy: ExistingPolicy,
  opts: &DeployOptions,
) -> Result<()> {
  let descriptors = project.config.group(group)?;
  let (_, network) = project.network()?;
  let artifacts = FoundryArtifacts::new(project.config.artifacts_dir());
  let mut ledger = project.ledger();

  let submitter = connect(network, &opts.signer).await?;
  let chain_id = network.chain_id;
  let ctx = ExecuteContext {
    submitter: &submitter,
    artifacts: &artifacts,
    config: ExecuteConfig {
      tag: project.tag.clone(),
      parallelism: opts.parallelism,
    },
  };

  let result = deploy(descriptors, answers, &ctx, &mut ledger, policy)
    .await
    .context("Deploy failed")?;

  println!();
  for record in &result.report.deployed {
    print_success(&format!("{} deployed at {}", record.name, record.address));
  }
  info!(
    deployed = result.report.deployed.len(),
    batches = result.report.batches,
    "deploy complete"
  );

  if !opts.no_verify {
    verify_new(project, network, chain_id, &artifacts, &result.report.deployed).await;
  }
  Ok(())
}

/// Planned names that replace an existing record.
fn replaced_names(project: &Project, chain_id: ChainId, plan: &ExecutionPlan) -> Result<Vec<String>> {
  let ledger = project.ledger();
  let mut names = Vec::new();
  for descriptor in plan.batches.iter().flatten() {
    if ledger.get(chain_id, &project.tag, &descriptor.deployment_name)?.is_some() {
      names.push(descriptor.deployment_name.clone());
    }
  }
  Ok(names)
}

async fn verify_new(
  project: &Project,
  network: &NetworkConfig,
  chain_id: ChainId,
  artifacts: &FoundryArtifacts,
  records: &[DeploymentRecord],
) {
  let Some(explorer) = &network.explorer else {
    print_info("No explorer configured; skipping verification");
    return;
  };
  let Some(api_key) = explorer.api_key() else {
    print_warning(&format!("{} is not set; skipping verification", explorer.api_key_env));
    return;
  };

  let verifier = EtherscanVerifier::new(&explorer.api_url, api_key, project.config.sources_dir());
  let summary = verify_deployments(&verifier, artifacts, chain_id, records).await;

  for (name, _) in &summary.verified {
    print_success(&format!("{name} submitted for verification"));
  }
  for failure in &summary.failed {
    print_warning(&format!(
      "verification of {} failed: {} (retry with `deployer verify {}`)",
      failure.name, failure.cause, failure.name
    ));
  }
}

/// Parallelism must be at least one.
pub fn parse_parallelism(raw: &str) -> Result<usize, String> {
  match raw.parse::<usize>() {
    Ok(0) => Err("parallelism must be at least 1".into()),
    Ok(n) => Ok(n),
    Err(e) => Err(e.to_string()),
  }
}
