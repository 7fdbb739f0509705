//! list-deployments integration tests.

use predicates::prelude::*;
use serde_json::Value;

use super::common::TestEnv;

#[test]
fn list_all_chains() {
  let env = TestEnv::project();

  env
    .cmd()
    .arg("list-deployments")
    .assert()
    .success()
    .stdout(
      predicate::str::contains("Chain 31337 (local):")
        .and(predicate::str::contains("Chain 31338 (remote):"))
        .and(predicate::str::contains("0x5FbDB2315678afecb367f032d93F642f64180aa3"))
        .and(predicate::str::contains("YieldBox")),
    );
}

#[test]
fn list_selected_network_only() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "remote", "list-deployments"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Chain 31338").and(predicate::str::contains("Chain 31337").not()));
}

#[test]
fn list_json_keeps_ledger_order() {
  let env = TestEnv::project();

  let output = env
    .cmd()
    .args(["list-deployments", "--chain", "31337", "--json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let listed: Value = serde_json::from_slice(&output.stdout).unwrap();
  let names: Vec<&str> = listed["31337"]
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["name"].as_str().unwrap())
    .collect();
  assert_eq!(names, vec!["Vault", "Token", "Multicall", "Cluster"]);
  assert!(listed.get("31338").is_none());
}

#[test]
fn list_unknown_tag_is_empty() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--tag", "staging", "list-deployments"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No deployments recorded under tag 'staging'"));
}

#[test]
fn list_corrupt_ledger_fails() {
  let env = TestEnv::project();
  env.write_file("deployments/default.json", "{ not json");

  env.cmd().arg("list-deployments").assert().failure();
}
