//! Implementation of the `deployer exec` command.
//!
//! Sends a single call to a recorded deployment, through the executor's
//! `multicall` unless `--direct` is given.

use anyhow::{Context, Result};

use deployer_lib::artifact::FoundryArtifacts;
use deployer_lib::call::{build_call, through_executor};
use deployer_lib::submit::TransactionSubmitter;

use super::{Project, SignerArgs, connect, parse_arg, runtime};
use crate::output::{print_stat, print_success};

pub fn cmd_exec(
  project: &Project,
  name: &str,
  method: &str,
  params: &[String],
  direct: bool,
  signer: &SignerArgs,
) -> Result<()> {
  let (_, network) = project.network()?;
  let ledger = project.ledger();
  let artifacts = FoundryArtifacts::new(project.config.artifacts_dir());
  let args: Vec<_> = params.iter().map(|p| parse_arg(p)).collect();

  let mut call = build_call(&ledger, &artifacts, network.chain_id, &project.tag, name, method, &args)
    .with_context(|| format!("Cannot build call {name}.{method}"))?;
  if !direct {
    call = through_executor(&ledger, network.chain_id, &project.tag, &project.config.project.executor, &[call])?;
  }

  print_stat("Network", &project.network_label(network.chain_id));
  print_stat("To", &call.to.to_checksum(None));

  let rt = runtime()?;
  let tx_hash = rt.block_on(async {
    let submitter = connect(network, signer).await?;
    let tx_hash = submitter.send(call.to, call.calldata).await?;
    anyhow::Ok(tx_hash)
  })?;

  print_success(&format!("{name}.{method} confirmed in {tx_hash}"));
  Ok(())
}
