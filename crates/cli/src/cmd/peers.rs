//! Implementation of the `deployer link-peers` command.
//!
//! Points every network's instance of a deployment at every other instance with
//! `setPeer`. Each network gets one transaction: the calls batched through its
//! executor, or sent one by one with `--direct`.

use anyhow::{Context, Result};

use deployer_lib::call::{PeerEndpoint, peer_links, through_executor};
use deployer_lib::submit::TransactionSubmitter;

use super::{Project, SignerArgs, connect, runtime};
use crate::output::{print_info, print_success, short_hash};

pub fn cmd_link_peers(project: &Project, name: &str, networks: &[String], direct: bool, signer: &SignerArgs) -> Result<()> {
  let ledger = project.ledger();

  let endpoints = networks
    .iter()
    .map(|network| PeerEndpoint::resolve(&project.config, &ledger, &project.tag, name, network))
    .collect::<Result<Vec<_>, _>>()
    .with_context(|| format!("Cannot link peers of '{name}'"))?;
  let links = peer_links(&endpoints)?;

  // Build every transaction before sending any.
  let mut batches = Vec::with_capacity(links.len());
  for link in links {
    let calls = if direct {
      link.calls
    } else {
      vec![through_executor(&ledger, link.chain_id, &project.tag, &project.config.project.executor, &link.calls)?]
    };
    batches.push((link.network, calls));
  }

  let rt = runtime()?;
  rt.block_on(async {
    for (network_name, calls) in batches {
      let (_, network) = project.config.network(Some(network_name.as_str()))?;
      let submitter = connect(network, signer).await?;

      print_info(&format!("Linking {name} on {network_name}"));
      for call in calls {
        let tx_hash = submitter.send(call.to, call.calldata).await?;
        print_success(&format!("{network_name}: confirmed in {}", short_hash(tx_hash)));
      }
    }
    anyhow::Ok(())
  })
}
