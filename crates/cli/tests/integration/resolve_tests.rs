//! End-to-end tests for `tagpin resolve`.
//!
//! Pinning lookups go through a stub `aws` binary (see `common`), so these
//! tests are unix-only where the stub is involved.

use predicates::prelude::*;
use serde_json::json;

use crate::common::TestEnv;

#[cfg(unix)]
#[test]
fn automatic_run_updates_built_services_and_pins_the_rest() {
  let env = TestEnv::from_fixture("services-entries.json");
  let built = env.write_built_images("api\n");
  let aws = env.stub_aws();
  let summary_path = env.temp.path().join("summary.json");

  env
    .tagpin_cmd()
    .args(["resolve", "--services", "services.json"])
    .args(["--built-images", built.to_str().unwrap()])
    .args(["--tag", "main-abc123"])
    .args(["--cluster", "prod"])
    .args(["--aws-bin", aws.to_str().unwrap()])
    .args(["--summary", summary_path.to_str().unwrap()])
    .assert()
    .success()
    .stdout(predicate::str::contains("Resolved tags for 2 service(s)"));

  // Array input came out as the canonical object map.
  let doc = env.services_json();
  assert!(doc["services"].is_object());
  assert_eq!(doc["services"]["app::api"]["image_tag"], json!("main-abc123"));
  assert_eq!(doc["services"]["app2::worker"]["image_tag"], json!("prod-v9"));
  // Passthrough fields survived the round trip.
  assert_eq!(doc["services"]["app::api"]["cpu"], json!(256));
  assert_eq!(doc["cluster_name"], json!("prod"));

  let summary: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
  assert_eq!(summary["updated_count"], json!(1));
  assert_eq!(summary["updated_keys"], json!(["app::api"]));
  assert_eq!(
    summary["updated_services"]["app::api"]["image_tag"],
    json!("main-abc123")
  );
}

#[test]
fn empty_built_images_fails_without_touching_the_document() {
  let env = TestEnv::from_fixture("services-object.json");
  let built = env.write_built_images("");
  let before = env.services_json();

  env
    .tagpin_cmd()
    .args(["resolve", "--services", "services.json"])
    .args(["--built-images", built.to_str().unwrap()])
    .args(["--tag", "main-abc123"])
    .args(["--cluster", "prod"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("artifact set is empty"));

  assert_eq!(env.services_json(), before);
}

#[test]
fn disjoint_built_images_fails_as_broken_mapping() {
  let env = TestEnv::from_fixture("services-object.json");
  let built = env.write_built_images("something-else\n");

  env
    .tagpin_cmd()
    .args(["resolve", "--services", "services.json"])
    .args(["--built-images", built.to_str().unwrap()])
    .args(["--tag", "main-abc123"])
    .args(["--cluster", "prod"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no services matched"));
}

#[test]
fn selection_without_tag_fails_before_any_mutation() {
  let env = TestEnv::from_fixture("services-object.json");
  let built = env.write_built_images("api\n");
  let before = env.services_json();

  env
    .tagpin_cmd()
    .args(["resolve", "--services", "services.json"])
    .args(["--built-images", built.to_str().unwrap()])
    .args(["--cluster", "prod"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no desired tag"));

  assert_eq!(env.services_json(), before);
}

#[test]
fn manual_all_updates_every_service() {
  let env = TestEnv::from_fixture("services-object.json");

  // Everything is selected, so no pinning lookups are issued and no aws
  // stub is needed.
  env
    .tagpin_cmd()
    .args(["resolve", "--services", "services.json"])
    .args(["--application", "all"])
    .args(["--tag", "release-7"])
    .args(["--cluster", "prod"])
    .assert()
    .success();

  let doc = env.services_json();
  assert_eq!(doc["services"]["app::api"]["image_tag"], json!("release-7"));
  assert_eq!(doc["services"]["app2::worker"]["image_tag"], json!("release-7"));
}

#[cfg(unix)]
#[test]
fn manual_scoped_run_only_updates_that_application() {
  let env = TestEnv::from_fixture("services-object.json");
  let aws = env.stub_aws();

  env
    .tagpin_cmd()
    .args(["resolve", "--services", "services.json"])
    .args(["--application", "app"])
    .args(["--tag", "release-7"])
    .args(["--cluster", "prod"])
    .args(["--aws-bin", aws.to_str().unwrap()])
    .assert()
    .success();

  let doc = env.services_json();
  assert_eq!(doc["services"]["app::api"]["image_tag"], json!("release-7"));
  assert_eq!(doc["services"]["app2::worker"]["image_tag"], json!("prod-v9"));
}

#[cfg(unix)]
#[test]
fn infra_only_run_pins_every_service() {
  let env = TestEnv::from_fixture("services-object.json");
  let aws = env.stub_aws();

  env
    .tagpin_cmd()
    .args(["resolve", "--services", "services.json"])
    .args(["--application", "all", "--no-update-images"])
    .args(["--cluster", "prod"])
    .args(["--aws-bin", aws.to_str().unwrap()])
    .assert()
    .success();

  let doc = env.services_json();
  assert_eq!(doc["services"]["app::api"]["image_tag"], json!("prod-v9"));
  assert_eq!(doc["services"]["app2::worker"]["image_tag"], json!("prod-v9"));
}

#[cfg(unix)]
#[test]
fn failed_lookup_names_the_service_and_aborts_the_run() {
  let env = TestEnv::from_fixture("services-object.json");
  let built = env.write_built_images("api\n");
  let aws = env.failing_aws();
  let before = env.services_json();

  env
    .tagpin_cmd()
    .args(["resolve", "--services", "services.json"])
    .args(["--built-images", built.to_str().unwrap()])
    .args(["--tag", "main-abc123"])
    .args(["--cluster", "prod"])
    .args(["--aws-bin", aws.to_str().unwrap()])
    .assert()
    .failure()
    .stderr(predicate::str::contains("app2::worker"));

  assert_eq!(env.services_json(), before);
}

#[test]
fn both_strategy_flags_are_rejected() {
  let env = TestEnv::from_fixture("services-object.json");
  let built = env.write_built_images("api\n");

  env
    .tagpin_cmd()
    .args(["resolve", "--services", "services.json"])
    .args(["--built-images", built.to_str().unwrap()])
    .args(["--application", "all"])
    .args(["--tag", "x"])
    .args(["--cluster", "prod"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn a_strategy_flag_is_required() {
  let env = TestEnv::from_fixture("services-object.json");

  env
    .tagpin_cmd()
    .args(["resolve", "--services", "services.json"])
    .args(["--tag", "x"])
    .args(["--cluster", "prod"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("required"));
}

#[cfg(unix)]
#[test]
fn out_flag_leaves_the_input_document_alone() {
  let env = TestEnv::from_fixture("services-tuples.json");
  let aws = env.stub_aws();
  let out_path = env.temp.path().join("resolved.json");
  let before = env.services_json();

  env
    .tagpin_cmd()
    .args(["resolve", "--services", "services.json"])
    .args(["--application", "app"])
    .args(["--tag", "release-7"])
    .args(["--cluster", "prod"])
    .args(["--aws-bin", aws.to_str().unwrap()])
    .args(["--out", out_path.to_str().unwrap()])
    .assert()
    .success();

  assert_eq!(env.services_json(), before);

  let out: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
  assert!(out["services"].is_object());
  assert_eq!(out["services"]["app::api"]["image_tag"], json!("release-7"));
}
