//! Implementation of the `deployer verify` command.
//!
//! Re-submits one recorded deployment for source verification. Unlike the
//! verification step of `deploy`, a failure here is an error.

use anyhow::{Context, Result, anyhow, bail};

use deployer_lib::artifact::FoundryArtifacts;
use deployer_lib::ledger::Ledger;
use deployer_lib::verify::{EtherscanVerifier, VerifyError, VerifyOutcome, verify_deployments};

use super::{Project, runtime};
use crate::output::print_success;

pub fn cmd_verify(project: &Project, name: &str) -> Result<()> {
  let (network_name, network) = project.network()?;
  let record = project
    .ledger()
    .get(network.chain_id, &project.tag, name)
    .context("Failed to read deployment ledger")?
    .ok_or_else(|| anyhow!("'{name}' is not deployed on {network_name}"))?;

  let explorer = network
    .explorer
    .as_ref()
    .ok_or(VerifyError::NoExplorer(network.chain_id))?;
  let api_key = explorer
    .api_key()
    .ok_or_else(|| VerifyError::NoApiKey(explorer.api_key_env.clone()))?;

  let verifier = EtherscanVerifier::new(&explorer.api_url, api_key, project.config.sources_dir());
  let artifacts = FoundryArtifacts::new(project.config.artifacts_dir());

  let rt = runtime()?;
  let mut summary = rt.block_on(verify_deployments(&verifier, &artifacts, network.chain_id, &[record]));

  if let Some(failure) = summary.failed.pop() {
    bail!("verification of {} failed: {}", failure.name, failure.cause);
  }
  for (name, outcome) in summary.verified {
    match outcome {
      VerifyOutcome::Submitted { guid } => print_success(&format!("{name} submitted for verification (guid {guid})")),
      VerifyOutcome::AlreadyVerified => print_success(&format!("{name} is already verified")),
    }
  }
  Ok(())
}
