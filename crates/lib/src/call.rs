//! Calls against deployed contracts.
//!
//! `exec` targets a recorded deployment by name and either calls it directly or
//! routes through the owning executor's `multicall`. Peer linking builds one
//! `setPeer` per ordered pair of networks and routes them the same way.

use alloy::primitives::{Address, B256, Bytes};
use alloy::sol;
use alloy::sol_types::SolCall;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::artifact::{AbiError, ArtifactError, ArtifactSource, encode_function};
use crate::config::{ConfigError, ProjectConfig};
use crate::ledger::{ChainId, Ledger, LedgerError};

sol! {
  struct Call3 {
    address target;
    bool allowFailure;
    bytes callData;
  }

  function multicall(Call3[] calls) external payable;

  function setPeer(uint32 eid, bytes32 peer) external;
}

/// A transaction ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCall {
  pub to: Address,
  pub calldata: Bytes,
}

/// Wrap calls into one executor `multicall`. Any failing call reverts the lot.
pub fn multicall(executor: Address, calls: &[PreparedCall]) -> PreparedCall {
  let calls = calls
    .iter()
    .map(|c| Call3 {
      target: c.to,
      allowFailure: false,
      callData: c.calldata.clone(),
    })
    .collect();

  PreparedCall {
    to: executor,
    calldata: multicallCall { calls }.abi_encode().into(),
  }
}

/// Encode `method(args)` against the recorded deployment `name`.
///
/// The artifact is the record's `contract`, falling back to the deployment
/// name for records written by hand.
pub fn build_call<L: Ledger, A: ArtifactSource>(
  ledger: &L,
  artifacts: &A,
  chain_id: ChainId,
  tag: &str,
  name: &str,
  method: &str,
  args: &[Value],
) -> Result<PreparedCall, CallError> {
  let record = ledger
    .get(chain_id, tag, name)?
    .ok_or_else(|| CallError::NotDeployed {
      name: name.to_string(),
      chain_id,
    })?;
  let artifact = artifacts.load(record.contract().unwrap_or(name))?;
  let calldata = encode_function(&artifact.abi, method, args)?;

  debug!(deployment = name, method, to = %record.address, "call encoded");
  Ok(PreparedCall {
    to: record.address,
    calldata,
  })
}

/// Resolve the executor contract and wrap `calls` in its `multicall`.
pub fn through_executor<L: Ledger>(
  ledger: &L,
  chain_id: ChainId,
  tag: &str,
  executor: &str,
  calls: &[PreparedCall],
) -> Result<PreparedCall, CallError> {
  let record = ledger
    .get(chain_id, tag, executor)?
    .ok_or_else(|| CallError::NoExecutor {
      name: executor.to_string(),
      chain_id,
    })?;
  Ok(multicall(record.address, calls))
}

/// One network's instance of a peered deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEndpoint {
  pub network: String,
  pub chain_id: ChainId,
  pub eid: u32,
  pub address: Address,
}

impl PeerEndpoint {
  /// Look up `name` on `network` using the config and ledger.
  pub fn resolve<L: Ledger>(
    config: &ProjectConfig,
    ledger: &L,
    tag: &str,
    name: &str,
    network: &str,
  ) -> Result<Self, CallError> {
    let (network, settings) = config.network(Some(network))?;
    let eid = settings.eid.ok_or_else(|| CallError::MissingEid(network.to_string()))?;
    let record = ledger
      .get(settings.chain_id, tag, name)?
      .ok_or_else(|| CallError::NotDeployed {
        name: name.to_string(),
        chain_id: settings.chain_id,
      })?;

    Ok(Self {
      network: network.to_string(),
      chain_id: settings.chain_id,
      eid,
      address: record.address,
    })
  }
}

/// `setPeer` calls to submit on one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerLinks {
  pub network: String,
  pub chain_id: ChainId,
  /// One call per remote, in endpoint order.
  pub calls: Vec<PreparedCall>,
}

/// Pair every endpoint with every other.
///
/// Each endpoint gets `setPeer(remote.eid, remote.address)` for every other
/// endpoint, with the remote address left-padded to 32 bytes.
pub fn peer_links(endpoints: &[PeerEndpoint]) -> Result<Vec<PeerLinks>, CallError> {
  if endpoints.len() < 2 {
    return Err(CallError::TooFewNetworks(endpoints.len()));
  }

  let links = endpoints
    .iter()
    .map(|local| {
      let calls = endpoints
        .iter()
        .filter(|remote| remote.network != local.network)
        .map(|remote| PreparedCall {
          to: local.address,
          calldata: setPeerCall {
            eid: remote.eid,
            peer: B256::left_padding_from(remote.address.as_slice()),
          }
          .abi_encode()
          .into(),
        })
        .collect();

      PeerLinks {
        network: local.network.clone(),
        chain_id: local.chain_id,
        calls,
      }
    })
    .collect();

  Ok(links)
}

#[derive(Debug, Error)]
pub enum CallError {
  #[error("'{name}' is not deployed on chain {chain_id}")]
  NotDeployed { name: String, chain_id: ChainId },

  #[error("executor '{name}' is not deployed on chain {chain_id} (use --direct to bypass)")]
  NoExecutor { name: String, chain_id: ChainId },

  #[error("network '{0}' has no eid configured")]
  MissingEid(String),

  #[error("peer linking needs at least two networks, got {0}")]
  TooFewNetworks(usize),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Ledger(#[from] LedgerError),

  #[error(transparent)]
  Artifact(#[from] ArtifactError),

  #[error(transparent)]
  Abi(#[from] AbiError),
}
