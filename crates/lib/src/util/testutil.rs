//! Test utilities for deployer-lib.
//!
//! [`MockSubmitter`] stands in for a node: deployments get deterministic
//! addresses, failures can be injected by deployment name, and every
//! submission is recorded for assertions.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, keccak256};
use serde_json::json;

use crate::artifact::{Artifact, StaticArtifacts};
use crate::ledger::ChainId;
use crate::submit::{Deployed, SubmitError, TransactionSubmitter};

#[derive(Default)]
struct MockState {
  deployed: Vec<(String, Bytes)>,
  sent: Vec<(Address, Bytes)>,
  fail_on: HashSet<String>,
  nonce: u64,
}

pub struct MockSubmitter {
  chain_id: ChainId,
  delay: Duration,
  state: Mutex<MockState>,
  in_flight: AtomicUsize,
  max_in_flight: AtomicUsize,
}

impl MockSubmitter {
  pub fn new(chain_id: ChainId) -> Self {
    Self {
      chain_id,
      delay: Duration::ZERO,
      state: Mutex::new(MockState::default()),
      in_flight: AtomicUsize::new(0),
      max_in_flight: AtomicUsize::new(0),
    }
  }

  /// Hold each submission for `delay` so concurrent submissions overlap.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  /// Make the deployment with this name revert.
  pub fn fail_on(self, name: &str) -> Self {
    self.state.lock().unwrap().fail_on.insert(name.to_string());
    self
  }

  /// Address the n-th creation (0-based, across all names) of `name` gets.
  pub fn address_for(name: &str, nonce: u64) -> Address {
    Address::from_slice(&keccak256(format!("{name}:{nonce}"))[12..])
  }

  pub fn deployed_names(&self) -> Vec<String> {
    self.state.lock().unwrap().deployed.iter().map(|(n, _)| n.clone()).collect()
  }

  pub fn init_code(&self, name: &str) -> Option<Bytes> {
    let state = self.state.lock().unwrap();
    state.deployed.iter().find(|(n, _)| n == name).map(|(_, code)| code.clone())
  }

  pub fn sent(&self) -> Vec<(Address, Bytes)> {
    self.state.lock().unwrap().sent.clone()
  }

  pub fn transaction_count(&self) -> usize {
    let state = self.state.lock().unwrap();
    state.deployed.len() + state.sent.len()
  }

  pub fn max_in_flight(&self) -> usize {
    self.max_in_flight.load(Ordering::SeqCst)
  }

  async fn enter(&self) {
    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
  }

  fn leave(&self) {
    self.in_flight.fetch_sub(1, Ordering::SeqCst);
  }
}

impl TransactionSubmitter for MockSubmitter {
  fn chain_id(&self) -> ChainId {
    self.chain_id
  }

  async fn deploy(&self, name: &str, init_code: Bytes) -> Result<Deployed, SubmitError> {
    self.enter().await;
    let result = {
      let mut state = self.state.lock().unwrap();
      let nonce = state.nonce;
      state.nonce += 1;
      let tx_hash = keccak256(format!("tx:{nonce}"));
      if state.fail_on.contains(name) {
        Err(SubmitError::Reverted(tx_hash))
      } else {
        state.deployed.push((name.to_string(), init_code));
        Ok(Deployed {
          address: Self::address_for(name, nonce),
          tx_hash,
        })
      }
    };
    self.leave();
    result
  }

  async fn send(&self, to: Address, calldata: Bytes) -> Result<TxHash, SubmitError> {
    self.enter().await;
    let tx_hash = {
      let mut state = self.state.lock().unwrap();
      let nonce = state.nonce;
      state.nonce += 1;
      state.sent.push((to, calldata));
      keccak256(format!("tx:{nonce}"))
    };
    self.leave();
    Ok(tx_hash)
  }
}

/// Artifact whose constructor takes the given `(name, type)` parameters.
pub fn artifact(contract: &str, inputs: &[(&str, &str)]) -> Artifact {
  let inputs: Vec<_> = inputs
    .iter()
    .map(|(name, ty)| json!({ "name": name, "type": ty }))
    .collect();
  let json = json!({
    "abi": [{ "type": "constructor", "stateMutability": "nonpayable", "inputs": inputs }],
    "bytecode": { "object": "0x6080" }
  });
  Artifact::from_json(contract, &json).unwrap()
}

/// Artifact whose constructor takes one `(address vault, uint256 fee)` struct.
pub fn struct_artifact(contract: &str) -> Artifact {
  let json = json!({
    "abi": [{
      "type": "constructor",
      "stateMutability": "nonpayable",
      "inputs": [{
        "name": "cfg",
        "type": "tuple",
        "components": [{ "name": "vault", "type": "address" }, { "name": "fee", "type": "uint256" }]
      }]
    }],
    "bytecode": { "object": "0x6080" }
  });
  Artifact::from_json(contract, &json).unwrap()
}

/// Artifacts for contracts `A`..`E` with no constructor args, plus the
/// `YieldBox(address)` / `TOFT((address,uint256))` pair.
pub fn artifacts() -> StaticArtifacts {
  let mut source = StaticArtifacts::new()
    .with(artifact("YieldBox", &[("asset", "address")]))
    .with(struct_artifact("TOFT"));
  for name in ["A", "B", "C", "D", "E"] {
    source.insert(artifact(name, &[]));
  }
  source
}
