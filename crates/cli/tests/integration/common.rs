//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated project directory.
///
/// Holds a `deployer.toml`, a ledger under `deployments/` and Foundry-style
/// artifacts under `out/`.
pub struct TestEnv {
  pub temp: TempDir,
  pub config_path: PathBuf,
}

impl TestEnv {
  /// The fixture project: config, `default` ledger and artifacts.
  pub fn project() -> Self {
    let env = Self::empty();
    env.write_file("deployer.toml", &fixture_content("deployer.toml"));
    env.write_file("deployments/default.json", &fixture_content("default.json"));
    env.write_file("out/YieldBox.sol/YieldBox.json", &fixture_content("YieldBox.json"));
    env.write_file("out/TOFT.sol/TOFT.json", &fixture_content("TOFT.json"));
    env
  }

  /// An empty directory; `config_path` does not exist yet.
  pub fn empty() -> Self {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("deployer.toml");
    Self { temp, config_path }
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Read a file relative to the temp directory.
  pub fn read_file(&self, relative_path: &str) -> String {
    std::fs::read_to_string(self.temp.path().join(relative_path)).unwrap()
  }

  pub fn ledger(&self) -> String {
    self.read_file("deployments/default.json")
  }

  /// A deployer command bound to this project.
  ///
  /// Clears every `DEPLOYER_*` variable so the host environment cannot leak a
  /// key or network into the test, and passes `--config` explicitly.
  pub fn cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("deployer");
    cmd.current_dir(self.temp.path());
    for var in [
      "DEPLOYER_CONFIG",
      "DEPLOYER_NETWORK",
      "DEPLOYER_TAG",
      "DEPLOYER_PRIVATE_KEY",
      "ETHERSCAN_API_KEY",
      "RUST_LOG",
    ] {
      cmd.env_remove(var);
    }
    cmd.arg("--config").arg(&self.config_path);
    cmd
  }
}
