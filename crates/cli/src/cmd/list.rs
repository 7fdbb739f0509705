//! Implementation of the `deployer list-deployments` command.

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use deployer_lib::ledger::{ChainId, Ledger};

use super::Project;
use crate::output::{print_info, print_json, symbols};

/// Print ledger records for one chain, or every chain under the tag.
///
/// The chain is `--chain`, else the `--network` one when given explicitly.
pub fn cmd_list(project: &Project, chain: Option<ChainId>, json: bool) -> Result<()> {
  let ledger = project.ledger();
  let manifest = ledger.manifest(&project.tag).context("Failed to read deployment ledger")?;

  let chain = match chain {
    Some(id) => Some(id),
    None if project.network_selected() => Some(project.network()?.1.chain_id),
    None => None,
  };
  let chains = match chain {
    Some(id) => vec![id],
    None => manifest.chain_ids(),
  };

  if json {
    let mut out = Map::new();
    for id in &chains {
      out.insert(id.to_string(), serde_json::to_value(manifest.records(*id))?);
    }
    return print_json(&Value::Object(out));
  }

  if chains.iter().all(|id| manifest.records(*id).is_empty()) {
    print_info(&format!("No deployments recorded under tag '{}'", project.tag));
    return Ok(());
  }

  for id in chains {
    let records = manifest.records(id);
    if records.is_empty() {
      continue;
    }

    println!("Chain {}:", project.network_label(id));
    let width = records.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for record in records {
      let contract = record.contract().unwrap_or("-");
      println!(
        "  {} {:width$}  {}  {}",
        symbols::INFO,
        record.name,
        record.address,
        contract,
        width = width
      );
    }
    println!();
  }

  Ok(())
}
