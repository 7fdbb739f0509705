//! deployer-lib: Core types and logic for declarative contract deployments
//!
//! A deployment group is a list of build descriptors. Deploying it:
//! - `plan`: orders descriptors into dependency batches against the ledger
//! - `prompt`: answers operator parameters the descriptors ask for
//! - `execute`: submits each batch and records confirmed deployments
//! - `verify`: submits recorded deployments to a block explorer, best effort
//!
//! The ledger (`ledger`), chain access (`submit`), compiled artifacts
//! (`artifact`) and operator input (`prompt`) sit behind traits so every step
//! can run without a node.

pub mod artifact;
pub mod call;
pub mod config;
pub mod consts;
pub mod descriptor;
pub mod execute;
pub mod ledger;
pub mod plan;
pub mod prompt;
pub mod submit;
#[cfg(test)]
mod util;
pub mod verify;
