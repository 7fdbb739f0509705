//! Deploy command integration tests.
//!
//! None of these reach a node: each case fails or finishes before connecting.

use predicates::prelude::*;

use super::common::TestEnv;

const OWNER: &str = "owner=0x00000000000000000000000000000000000000aa";

#[test]
fn deploy_complete_group_sends_nothing() {
  let env = TestEnv::project();
  let before = env.ledger();

  env
    .cmd()
    .args(["--network", "local", "deploy", "core"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to deploy (2 already deployed)"));

  assert_eq!(env.ledger(), before);
}

#[test]
fn deploy_cycle_fails_without_touching_the_ledger() {
  let env = TestEnv::project();
  let before = env.ledger();

  env
    .cmd()
    .args(["--network", "local", "deploy", "cyclic"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("dependency cycle between: A, B"));

  assert_eq!(env.ledger(), before);
}

#[test]
fn deploy_unresolved_dependency_names_both_sides() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "local", "deploy", "dangling"])
    .assert()
    .failure()
    .stderr(predicate::str::contains(
      "'Oracle' depends on 'Missing', which is neither in the group nor deployed",
    ));
}

#[test]
fn deploy_prompt_without_terminal_fails() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "local", "deploy", "prompted"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("cannot prompt for 'owner' in non-interactive mode"));
}

#[test]
fn deploy_rejects_invalid_param() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "local", "deploy", "prompted", "--param", "owner=nobody"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid value for 'owner'"));
}

#[test]
fn deploy_requires_a_private_key() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "local", "deploy", "prompted", "--param", OWNER])
    .assert()
    .failure()
    .stderr(predicate::str::contains("DEPLOYER_PRIVATE_KEY"));
}

#[test]
fn deploy_overwrite_needs_confirmation() {
  let env = TestEnv::project();
  let before = env.ledger();

  env
    .cmd()
    .args(["--network", "local", "deploy", "core", "--overwrite"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Use --yes to proceed"));

  assert_eq!(env.ledger(), before);
}

#[test]
fn deploy_rejects_zero_parallelism() {
  let env = TestEnv::project();

  env
    .cmd()
    .args(["--network", "local", "deploy", "core", "--parallelism", "0"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("parallelism must be at least 1"));
}

#[test]
fn deploy_missing_config_fails() {
  let env = TestEnv::empty();

  env
    .cmd()
    .args(["deploy", "core"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("config file not found"));
}
