//! JSON-RPC submitter backed by an alloy provider and a local key.

use alloy::network::{Ethereum, EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Deployed, SubmitError, TransactionSubmitter};
use crate::ledger::ChainId;

/// Submits transactions over HTTP JSON-RPC.
///
/// Broadcasts are serialized so nonces are assigned in submission order;
/// confirmations are awaited without holding the lock.
pub struct RpcSubmitter {
  provider: DynProvider,
  chain_id: ChainId,
  sender: Address,
  confirmations: u64,
  broadcast_lock: Mutex<()>,
}

impl RpcSubmitter {
  /// Connect and query the chain id.
  pub async fn connect(rpc_url: &str, private_key: &str, confirmations: u64) -> Result<Self, SubmitError> {
    let signer = private_key
      .trim()
      .parse::<PrivateKeySigner>()
      .map_err(|e| SubmitError::InvalidKey(e.to_string()))?;
    let sender = signer.address();

    let url = rpc_url.parse::<Url>().map_err(|e| SubmitError::InvalidUrl {
      url: rpc_url.to_string(),
      reason: e.to_string(),
    })?;

    let provider = ProviderBuilder::new()
      .wallet(EthereumWallet::new(signer))
      .connect_http(url);
    let chain_id = provider
      .get_chain_id()
      .await
      .map_err(|e| SubmitError::Rpc(e.to_string()))?;

    info!(chain_id, sender = %sender, "connected");

    Ok(Self {
      provider: DynProvider::new(provider),
      chain_id,
      sender,
      confirmations: confirmations.max(1),
      broadcast_lock: Mutex::new(()),
    })
  }

  /// Fail if the node is not on the expected chain.
  pub fn expect_chain(self, expected: ChainId) -> Result<Self, SubmitError> {
    if self.chain_id != expected {
      return Err(SubmitError::ChainMismatch {
        expected,
        actual: self.chain_id,
      });
    }
    Ok(self)
  }

  pub fn sender(&self) -> Address {
    self.sender
  }

  async fn broadcast(&self, tx: TransactionRequest) -> Result<PendingTransactionBuilder<Ethereum>, SubmitError> {
    let _guard = self.broadcast_lock.lock().await;
    self
      .provider
      .send_transaction(tx)
      .await
      .map_err(|e| SubmitError::Rpc(e.to_string()))
  }

  async fn confirm(
    &self,
    pending: PendingTransactionBuilder<Ethereum>,
  ) -> Result<TransactionReceipt, SubmitError> {
    let tx_hash = *pending.tx_hash();
    let receipt = pending
      .with_required_confirmations(self.confirmations)
      .get_receipt()
      .await
      .map_err(|e| SubmitError::Unconfirmed {
        tx_hash,
        reason: e.to_string(),
      })?;

    if !receipt.status() {
      return Err(SubmitError::Reverted(tx_hash));
    }
    Ok(receipt)
  }
}

impl TransactionSubmitter for RpcSubmitter {
  fn chain_id(&self) -> ChainId {
    self.chain_id
  }

  async fn deploy(&self, name: &str, init_code: Bytes) -> Result<Deployed, SubmitError> {
    let tx = TransactionRequest::default()
      .with_from(self.sender)
      .with_deploy_code(init_code);

    let pending = self.broadcast(tx).await?;
    let tx_hash = *pending.tx_hash();
    debug!(deployment = name, tx = %tx_hash, "creation broadcast");

    let receipt = self.confirm(pending).await?;
    let address = receipt.contract_address.ok_or(SubmitError::NoContractAddress(tx_hash))?;

    Ok(Deployed { address, tx_hash })
  }

  async fn send(&self, to: Address, calldata: Bytes) -> Result<TxHash, SubmitError> {
    let tx = TransactionRequest::default()
      .with_from(self.sender)
      .with_to(to)
      .with_input(calldata);

    let pending = self.broadcast(tx).await?;
    let tx_hash = *pending.tx_hash();
    debug!(to = %to, tx = %tx_hash, "call broadcast");

    self.confirm(pending).await?;
    Ok(tx_hash)
  }
}
