//! Transaction submission.
//!
//! The executor talks to the chain only through [`TransactionSubmitter`], so
//! planning and execution can be exercised without a node.

mod rpc;

use std::future::Future;

use alloy::primitives::{Address, Bytes, TxHash};
use thiserror::Error;

pub use rpc::RpcSubmitter;

use crate::ledger::ChainId;

/// A confirmed contract creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployed {
  pub address: Address,
  pub tx_hash: TxHash,
}

/// Signs, broadcasts and confirms transactions on one chain.
pub trait TransactionSubmitter: Sync {
  fn chain_id(&self) -> ChainId;

  /// Submit a contract creation and wait until it is confirmed.
  fn deploy(&self, name: &str, init_code: Bytes) -> impl Future<Output = Result<Deployed, SubmitError>> + Send;

  /// Submit a call and wait until it is confirmed.
  fn send(&self, to: Address, calldata: Bytes) -> impl Future<Output = Result<TxHash, SubmitError>> + Send;
}

/// Errors from the chain or the signer.
#[derive(Debug, Error)]
pub enum SubmitError {
  #[error("invalid private key: {0}")]
  InvalidKey(String),

  #[error("invalid rpc url '{url}': {reason}")]
  InvalidUrl { url: String, reason: String },

  #[error("rpc error: {0}")]
  Rpc(String),

  #[error("node reports chain id {actual}, expected {expected}")]
  ChainMismatch { expected: ChainId, actual: ChainId },

  #[error("transaction {tx_hash} was not confirmed: {reason}")]
  Unconfirmed { tx_hash: TxHash, reason: String },

  #[error("transaction {0} reverted")]
  Reverted(TxHash),

  #[error("receipt for {0} has no contract address")]
  NoContractAddress(TxHash),
}
