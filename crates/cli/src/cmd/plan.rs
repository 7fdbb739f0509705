//! Implementation of the `deployer plan` command.
//!
//! Resolves a group against the ledger and prints the batches it would deploy.
//! Never touches the network.

use anyhow::{Context, Result};
use serde_json::json;

use deployer_lib::ledger::{ChainId, Ledger};
use deployer_lib::plan::{ExecutionPlan, ExistingPolicy, resolve_plan};
use deployer_lib::prompt::{CannedParameters, ParameterSource};

use super::Project;
use crate::output::{print_info, print_json, print_stat, print_warning, symbols};

/// Plan `group` against the selected network's ledger.
pub(super) fn load_plan(project: &Project, group: &str, policy: ExistingPolicy) -> Result<(ChainId, ExecutionPlan)> {
  let descriptors = project.config.group(group)?;
  let (_, network) = project.network()?;
  let existing = project
    .ledger()
    .all(network.chain_id, &project.tag)
    .context("Failed to read deployment ledger")?;

  let plan = resolve_plan(descriptors, &existing, policy).with_context(|| format!("Cannot plan group '{group}'"))?;
  Ok((network.chain_id, plan))
}

pub fn cmd_plan(project: &Project, group: &str, overwrite: bool, params: &[String], json: bool) -> Result<()> {
  let policy = if overwrite {
    ExistingPolicy::Overwrite
  } else {
    ExistingPolicy::Skip
  };
  let (chain_id, plan) = load_plan(project, group, policy)?;
  let params = CannedParameters::from_pairs(params)?;

  if json {
    let batches = plan.batch_names();
    let skipped: Vec<_> = plan.skipped.iter().map(|r| r.name.as_str()).collect();
    let external: Vec<_> = plan.external.iter().map(|r| r.name.as_str()).collect();
    return print_json(&json!({
      "chainId": chain_id,
      "tag": project.tag,
      "batches": batches,
      "skipped": skipped,
      "external": external,
    }));
  }

  print_stat("Network", &project.network_label(chain_id));
  print_stat("Tag", &project.tag);
  println!();

  if plan.is_empty() {
    print_info(&format!("Nothing to deploy ({} already deployed)", plan.skipped.len()));
    return Ok(());
  }

  for (i, batch) in plan.batches.iter().enumerate() {
    println!("Batch {}:", i + 1);
    for descriptor in batch {
      println!(
        "  {} {} ({})",
        symbols::PLUS,
        descriptor.deployment_name,
        descriptor.contract
      );
      for spec in descriptor.prompts() {
        match params.ask(spec)? {
          Some(value) => match spec.kind.check(&value) {
            Ok(value) => println!("      {} = {}", spec.key, value),
            Err(reason) => print_warning(&format!("{}: {}", spec.key, reason)),
          },
          None => println!("      {} (will prompt)", spec.key),
        }
      }
    }
  }

  if !plan.skipped.is_empty() {
    println!();
    println!("Already deployed:");
    for record in &plan.skipped {
      println!("  {} {} {} {}", symbols::INFO, record.name, symbols::ARROW, record.address);
    }
  }

  if !plan.external.is_empty() {
    println!();
    println!("From ledger:");
    for record in &plan.external {
      println!("  {} {} {} {}", symbols::INFO, record.name, symbols::ARROW, record.address);
    }
  }

  println!();
  print_info(&format!(
    "Would deploy {} contract(s) in {} batch(es)",
    plan.deployment_count(),
    plan.batches.len()
  ));

  Ok(())
}
