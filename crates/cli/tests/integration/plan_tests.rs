//! Tests for `tagpin plan`.

use predicates::prelude::*;
use serde_json::json;

use crate::common::TestEnv;

#[test]
fn plan_shows_the_update_pin_split_without_writing() {
  let env = TestEnv::from_fixture("services-object.json");
  let built = env.write_built_images("api\n");
  let before = env.services_json();

  let assert = env
    .tagpin_cmd()
    .args(["plan", "--services", "services.json"])
    .args(["--built-images", built.to_str().unwrap()])
    .args(["--format", "json"])
    .assert()
    .success();

  let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
  let payload: serde_json::Value = serde_json::from_str(&stdout).unwrap();
  assert_eq!(payload["updated_count"], json!(1));
  assert_eq!(payload["updated_keys"], json!(["app::api"]));
  assert_eq!(payload["pinned_keys"], json!(["app2::worker"]));

  // A plan never touches the document.
  assert_eq!(env.services_json(), before);
}

#[test]
fn plan_with_empty_artifacts_fails_like_resolve() {
  let env = TestEnv::from_fixture("services-object.json");
  let built = env.write_built_images("# nothing built\n");

  env
    .tagpin_cmd()
    .args(["plan", "--services", "services.json"])
    .args(["--built-images", built.to_str().unwrap()])
    .assert()
    .failure()
    .stderr(predicate::str::contains("artifact set is empty"));
}

#[test]
fn infra_only_plan_is_valid_and_selects_nothing() {
  let env = TestEnv::from_fixture("services-object.json");

  env
    .tagpin_cmd()
    .args(["plan", "--services", "services.json"])
    .args(["--application", "all", "--no-update-images"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No services selected"));
}

#[test]
fn scoped_plan_lists_only_matching_services() {
  let env = TestEnv::from_fixture("services-entries.json");

  let assert = env
    .tagpin_cmd()
    .args(["plan", "--services", "services.json"])
    .args(["--application", "app2"])
    .args(["--format", "json"])
    .assert()
    .success();

  let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
  let payload: serde_json::Value = serde_json::from_str(&stdout).unwrap();
  assert_eq!(payload["updated_keys"], json!(["app2::worker"]));
  assert_eq!(payload["pinned_keys"], json!(["app::api"]));
}
