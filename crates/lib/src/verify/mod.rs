//! Best-effort source verification.
//!
//! Verification runs after deployments are confirmed and recorded. Nothing in
//! here can fail a deployment: every error becomes a [`VerificationFailed`]
//! entry in the summary and a warning in the log.

mod etherscan;
mod types;

use std::future::Future;

use tracing::{info, warn};

pub use etherscan::{EtherscanVerifier, build_standard_input};
pub use types::{VerificationFailed, VerifyError, VerifyOutcome, VerifyRequest, VerifySummary};

use crate::artifact::{ArtifactSource, constructor_args};
use crate::ledger::{ChainId, DeploymentRecord};

/// Submits deployed contracts to a block explorer.
pub trait Verifier: Sync {
  fn verify(&self, request: &VerifyRequest) -> impl Future<Output = Result<VerifyOutcome, VerifyError>> + Send;
}

/// Build the verification request for a ledger record.
pub fn verify_request<A: ArtifactSource>(
  artifacts: &A,
  chain_id: ChainId,
  record: &DeploymentRecord,
) -> Result<VerifyRequest, VerifyError> {
  let incomplete = || VerifyError::IncompleteRecord(record.name.clone());
  let contract = record.contract().ok_or_else(incomplete)?;
  let args = record.args().ok_or_else(incomplete)?;

  let artifact = artifacts.load(contract)?;
  let constructor_args = constructor_args(&artifact, args)?;

  Ok(VerifyRequest {
    name: record.name.clone(),
    address: record.address,
    chain_id,
    artifact,
    constructor_args,
  })
}

/// Verify each record in turn, collecting failures instead of returning them.
pub async fn verify_deployments<V, A>(
  verifier: &V,
  artifacts: &A,
  chain_id: ChainId,
  records: &[DeploymentRecord],
) -> VerifySummary
where
  V: Verifier,
  A: ArtifactSource,
{
  let mut summary = VerifySummary::default();

  for record in records {
    let result = match verify_request(artifacts, chain_id, record) {
      Ok(request) => verifier.verify(&request).await,
      Err(e) => Err(e),
    };

    match result {
      Ok(outcome) => {
        info!(deployment = %record.name, ?outcome, "verified");
        summary.verified.push((record.name.clone(), outcome));
      }
      Err(cause) => {
        warn!(deployment = %record.name, error = %cause, "verification failed");
        summary.failed.push(VerificationFailed {
          name: record.name.clone(),
          cause,
        });
      }
    }
  }

  summary
}
