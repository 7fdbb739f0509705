/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "deployer.toml";

/// Ledger tag used when neither the command line nor the config names one.
pub const DEFAULT_TAG: &str = "default";

/// Deployment name of the owning executor (multicall) contract.
pub const DEFAULT_EXECUTOR: &str = "Multicall";

/// Environment variable holding the explorer API key.
pub const DEFAULT_EXPLORER_KEY_ENV: &str = "ETHERSCAN_API_KEY";

pub const DEFAULT_ARTIFACTS_DIR: &str = "out";
pub const DEFAULT_DEPLOYMENTS_DIR: &str = "deployments";
