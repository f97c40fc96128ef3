//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
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

/// Stub `aws` that answers the two queries the lookup chain issues.
///
/// Every describe-services call reports the requested service as ACTIVE and
/// every task definition runs `ghcr.io/org/pinned:prod-v9`, so pinned
/// services always resolve to `prod-v9`.
const AWS_STUB: &str = r#"#!/bin/sh
op=""
name=""
while [ $# -gt 0 ]; do
  case "$1" in
    describe-services) op="services" ;;
    describe-task-definition) op="taskdef" ;;
    --services) shift; name="$1" ;;
  esac
  shift
done
case "$op" in
  services)
    cat <<EOF
{"services":[{"serviceName":"$name","status":"ACTIVE","taskDefinition":"arn:aws:ecs:local:0:task-definition/$name:1"}],"failures":[]}
EOF
    ;;
  taskdef)
    cat <<'EOF'
{"taskDefinition":{"containerDefinitions":[{"name":"main","image":"ghcr.io/org/pinned:prod-v9"}]}}
EOF
    ;;
  *)
    echo "unexpected aws invocation" >&2
    exit 2
    ;;
esac
"#;

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the services
/// document, any built-images file, and the stub AWS binary.
pub struct TestEnv {
  pub temp: TempDir,
  pub services_path: PathBuf,
}

impl TestEnv {
  /// Create from a fixture file.
  ///
  /// Copies the fixture content to a temporary `services.json`.
  pub fn from_fixture(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let services_path = temp.path().join("services.json");
    std::fs::write(&services_path, fixture_content(name)).unwrap();
    Self {
      temp,
      services_path,
    }
  }

  /// Write a built-images file with the given content.
  pub fn write_built_images(&self, content: &str) -> PathBuf {
    let path = self.temp.path().join("built-images.txt");
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Write the stub `aws` binary and return its path.
  #[cfg(unix)]
  pub fn stub_aws(&self) -> PathBuf {
    self.write_aws(AWS_STUB)
  }

  /// Write an `aws` stub that always fails, for lookup-failure tests.
  #[cfg(unix)]
  pub fn failing_aws(&self) -> PathBuf {
    self.write_aws("#!/bin/sh\necho 'ResourceNotFoundException' >&2\nexit 254\n")
  }

  #[cfg(unix)]
  fn write_aws(&self, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = self.temp.path().join("aws");
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
  }

  /// Get a pre-configured Command for the tagpin binary.
  pub fn tagpin_cmd(&self) -> Command {
    let mut cmd = Command::cargo_bin("tagpin").unwrap();
    cmd.current_dir(self.temp.path());
    cmd.env_remove("TAGPIN_CLUSTER");
    cmd.env_remove("TAGPIN_AWS_BIN");
    cmd
  }

  /// Read the services document back as JSON.
  pub fn services_json(&self) -> serde_json::Value {
    let body = std::fs::read_to_string(&self.services_path).unwrap();
    serde_json::from_str(&body).unwrap()
  }
}
