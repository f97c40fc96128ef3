//! Tests for `tagpin verify`.

use predicates::prelude::*;

use crate::common::TestEnv;

#[test]
fn consistent_mapping_passes() {
  let env = TestEnv::from_fixture("services-object.json");

  env
    .tagpin_cmd()
    .args(["verify", "--services", "services.json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("mapping is consistent"));
}

#[test]
fn inconsistent_mapping_fails_and_names_every_issue() {
  let env = TestEnv::from_fixture("services-object.json");
  std::fs::write(
    &env.services_path,
    serde_json::json!({
      "services": {
        "app::api": {
          "container_image": "",
          "image_tag": "old",
          "application": "app"
        },
        "bare-key": {
          "container_image": "ghcr.io/org/worker",
          "image_tag": "old",
          "application": "app2"
        },
        "app::web": {
          "container_image": "ghcr.io/org/web",
          "image_tag": "old",
          "application": "admin"
        }
      }
    })
    .to_string(),
  )
  .unwrap();

  env
    .tagpin_cmd()
    .args(["verify", "--services", "services.json"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no container_image"))
    .stderr(predicate::str::contains("bare-key"))
    .stderr(predicate::str::contains("app::web"));
}

#[test]
fn verify_json_output_lists_issues() {
  let env = TestEnv::from_fixture("services-object.json");
  std::fs::write(
    &env.services_path,
    serde_json::json!({
      "services": {
        "bare-key": {
          "container_image": "ghcr.io/org/worker",
          "image_tag": "old",
          "application": "app2"
        }
      }
    })
    .to_string(),
  )
  .unwrap();

  let assert = env
    .tagpin_cmd()
    .args(["verify", "--services", "services.json"])
    .args(["--format", "json"])
    .assert()
    .failure();

  let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
  let payload: serde_json::Value = serde_json::from_str(&stdout).unwrap();
  assert_eq!(payload["services"], serde_json::json!(1));
  assert_eq!(payload["issues"].as_array().unwrap().len(), 1);
}
