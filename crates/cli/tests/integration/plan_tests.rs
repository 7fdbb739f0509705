//! Plan command integration tests.

use predicates::prelude::*;
use serde_json::Value;

use super::common::TestEnv;

#[test]
fn plan_complete_group_has_nothing_to_do() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "local", "plan", "core"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to deploy (2 already deployed)"));
}

#[test]
fn plan_overwrite_orders_batches() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "local", "plan", "core", "--overwrite"])
    .assert()
    .success()
    .stdout(
      predicate::str::contains("Batch 1:\n  + Vault (YieldBox)")
        .and(predicate::str::contains("Batch 2:\n  + Token (TOFT)"))
        .and(predicate::str::contains("Would deploy 2 contract(s) in 2 batch(es)")),
    );
}

#[test]
fn plan_json_lists_external_references() {
  let env = TestEnv::project();

  let output = env
    .cmd()
    .args(["--network", "local", "plan", "fresh", "--json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let plan: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(plan["chainId"], 31337);
  assert_eq!(plan["batches"], serde_json::json!([["Strategy"]]));
  assert_eq!(plan["external"], serde_json::json!(["Cluster"]));
}

#[test]
fn plan_on_another_network_sees_its_own_ledger() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "remote", "plan", "core"])
    .assert()
    .success()
    .stdout(
      predicate::str::contains("Batch 1:\n  + Vault (YieldBox)")
        .and(predicate::str::contains("Already deployed:"))
        .and(predicate::str::contains("Batch 2").not()),
    );
}

#[test]
fn plan_shows_supplied_and_pending_prompts() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "local", "plan", "prompted"])
    .assert()
    .success()
    .stdout(predicate::str::contains("owner (will prompt)"));

  env
    .cmd()
    .args([
      "--network",
      "local",
      "plan",
      "prompted",
      "--param",
      "owner=0x00000000000000000000000000000000000000aa",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("owner = \"0x").and(predicate::str::contains("will prompt").not()));
}

#[test]
fn plan_cycle_fails() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "local", "plan", "cyclic"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("dependency cycle between: A, B"));
}

#[test]
fn plan_requires_network_when_several_are_configured() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["plan", "core"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--network is required (available: local, remote)"));
}

#[test]
fn plan_unknown_group_fails() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "local", "plan", "periphery"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown group 'periphery'"));
}
