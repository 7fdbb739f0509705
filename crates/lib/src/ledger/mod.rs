//! Deployment ledger: the persisted record of what is deployed where.

mod storage;
mod types;

pub use storage::{JsonLedger, Ledger, MemoryLedger};
pub use types::{ChainId, ChainManifest, DeploymentRecord, LedgerError, validate_tag};
