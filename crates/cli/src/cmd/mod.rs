mod deploy;
mod exec;
mod list;
mod peers;
mod plan;
mod verify;

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::Value;

use deployer_lib::config::{NetworkConfig, ProjectConfig};
use deployer_lib::ledger::{ChainId, JsonLedger, validate_tag};
use deployer_lib::submit::RpcSubmitter;

pub use deploy::{DeployOptions, cmd_deploy, parse_parallelism};
pub use exec::cmd_exec;
pub use list::cmd_list;
pub use peers::cmd_link_peers;
pub use plan::cmd_plan;
pub use verify::cmd_verify;

/// Signing key for commands that send transactions.
#[derive(Debug, Clone, Args)]
pub struct SignerArgs {
  /// Hex private key of the deployer account
  #[arg(long, env = "DEPLOYER_PRIVATE_KEY", hide_env_values = true)]
  pub private_key: Option<String>,
}

impl SignerArgs {
  fn require(&self) -> Result<&str> {
    match self.private_key.as_deref() {
      Some(key) if !key.trim().is_empty() => Ok(key.trim()),
      _ => bail!("a private key is required: pass --private-key or set DEPLOYER_PRIVATE_KEY"),
    }
  }
}

/// Config plus the global selections every command works against.
pub struct Project {
  pub config: ProjectConfig,
  network: Option<String>,
  pub tag: String,
}

impl Project {
  pub fn load(config_path: &Path, network: Option<String>, tag: Option<String>) -> Result<Self> {
    let config = ProjectConfig::load(config_path).context("Failed to load project config")?;
    let tag = tag.unwrap_or_else(|| config.project.default_tag.clone());
    validate_tag(&tag)?;
    Ok(Self { config, network, tag })
  }

  /// The selected network (`--network`, or the only one configured).
  pub fn network(&self) -> Result<(&str, &NetworkConfig)> {
    Ok(self.config.network(self.network.as_deref())?)
  }

  pub fn network_selected(&self) -> bool {
    self.network.is_some()
  }

  pub fn ledger(&self) -> JsonLedger {
    JsonLedger::new(self.config.deployments_dir())
  }

  pub fn network_label(&self, chain_id: ChainId) -> String {
    match self.config.network_by_chain(chain_id) {
      Some((name, _)) => format!("{chain_id} ({name})"),
      None => chain_id.to_string(),
    }
  }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}

async fn connect(network: &NetworkConfig, signer: &SignerArgs) -> Result<RpcSubmitter> {
  let key = signer.require()?;
  let submitter = RpcSubmitter::connect(&network.rpc_url, key, network.confirmations)
    .await
    .with_context(|| format!("Failed to connect to {}", network.rpc_url))?
    .expect_chain(network.chain_id)?;
  Ok(submitter)
}

/// Command-line argument to a JSON value: JSON when it parses, a string otherwise.
fn parse_arg(raw: &str) -> Value {
  serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
