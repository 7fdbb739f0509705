//! exec, verify and link-peers integration tests.
//!
//! These stop before any transaction is sent.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn exec_unknown_deployment_fails() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "local", "exec", "Vault2", "setFee", "--params", "7"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("'Vault2' is not deployed on chain 31337"));
}

#[test]
fn exec_unknown_method_fails() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "local", "exec", "Token", "setOwner", "--params", "7"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no function 'setOwner'"));
}

#[test]
fn exec_requires_a_private_key() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "local", "exec", "Token", "setFee", "--params", "7"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("DEPLOYER_PRIVATE_KEY"));
}

#[test]
fn exec_without_executor_fails() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "remote", "exec", "Token", "setFee", "--params", "7"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("executor 'Multicall' is not deployed on chain 31338"));
}

#[test]
fn verify_without_explorer_fails() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "local", "verify", "Vault"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no explorer configured for chain 31337"));
}

#[test]
fn link_peers_needs_two_networks() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["link-peers", "Token", "--networks", "local"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("at least two networks"));
}

#[test]
fn link_peers_through_missing_executor_fails() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["link-peers", "Token", "--networks", "local,remote"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("executor 'Multicall' is not deployed on chain 31338"));
}

#[test]
fn link_peers_direct_requires_a_private_key() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["link-peers", "Token", "--networks", "local,remote", "--direct"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("DEPLOYER_PRIVATE_KEY"));
}
