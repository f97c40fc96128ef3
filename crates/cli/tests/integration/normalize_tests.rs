//! Tests for `tagpin normalize`.

use predicates::prelude::*;
use serde_json::json;

use crate::common::TestEnv;

#[test]
fn dhall_encoding_is_rewritten_as_object_map() {
  let env = TestEnv::from_fixture("services-dhall.json");

  env
    .tagpin_cmd()
    .args(["normalize", "--services", "services.json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Normalized 2 service(s)"));

  let doc = env.services_json();
  assert!(doc["services"].is_object());
  assert_eq!(doc["services"]["app::api"]["cpu"], json!(256));
  assert_eq!(doc["cluster_name"], json!("prod"));
}

#[test]
fn all_encodings_normalize_to_the_same_document() {
  let fixtures = [
    "services-object.json",
    "services-dhall.json",
    "services-entries.json",
    "services-tuples.json",
  ];

  let mut normalized = Vec::new();
  for fixture in fixtures {
    let env = TestEnv::from_fixture(fixture);
    env
      .tagpin_cmd()
      .args(["normalize", "--services", "services.json"])
      .assert()
      .success();
    normalized.push(env.services_json());
  }

  for doc in &normalized[1..] {
    assert_eq!(doc, &normalized[0]);
  }
}

#[test]
fn normalize_is_idempotent() {
  let env = TestEnv::from_fixture("services-entries.json");

  env
    .tagpin_cmd()
    .args(["normalize", "--services", "services.json"])
    .assert()
    .success();
  let first = env.services_json();

  env
    .tagpin_cmd()
    .args(["normalize", "--services", "services.json"])
    .assert()
    .success();
  assert_eq!(env.services_json(), first);
}

#[test]
fn unrecognized_shape_is_rejected_with_detected_type() {
  let env = TestEnv::from_fixture("services-object.json");
  std::fs::write(&env.services_path, r#"{"services": 42}"#).unwrap();

  env
    .tagpin_cmd()
    .args(["normalize", "--services", "services.json"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("found number"));
}
