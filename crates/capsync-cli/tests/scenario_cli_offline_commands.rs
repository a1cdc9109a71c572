//! Scenario: CLI commands that need neither Postgres nor the catalog.
//!
//! # Invariants under test
//! - `config-hash` merges `--config` layers in order and prints a stable hash.
//! - `registry lookup` prints matching definitions as JSON and exits non-zero
//!   when nothing matches.
//! - Lookup keys are mutually exclusive.
//! - `db` commands resolve the URL through the configured `database.url_env`.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const RHEL: &str = r#"
platform: RHEL
id: rhel-for-x86
serviceType: RHEL System
metrics:
  - id: Sockets
variants:
  - tag: RHEL for x86
    engineeringIds: [479]
    roles: [Red Hat Enterprise Linux Server]
"#;

const ROSA: &str = r#"
platform: OpenShift
id: rosa
serviceType: rosa Instance
metrics:
  - id: Cores
    awsDimension: four_vcpu_hour
variants:
  - tag: rosa
    engineeringIds: [290]
    productNames: [Red Hat OpenShift Service on AWS]
"#;

fn write_definitions(dir: &Path) {
    fs::create_dir_all(dir.join("rhel")).unwrap();
    fs::write(dir.join("rhel/rhel-for-x86.yaml"), RHEL).unwrap();
    fs::write(dir.join("rosa.yaml"), ROSA).unwrap();
}

fn capsync() -> Command {
    let mut cmd = Command::cargo_bin("capsync").unwrap();
    cmd.env_remove("CAPSYNC_CONFIG").env("RUST_LOG", "error");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out).unwrap()
}

#[test]
fn config_hash_is_layer_order_sensitive_and_stable() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path().join("base.yaml");
    let env = tmp.path().join("env.yaml");
    fs::write(
        &base,
        "upstream:\n  base_url: http://catalog.local\n  timeout_secs: 30\n",
    )
    .unwrap();
    fs::write(&env, "upstream:\n  timeout_secs: 5\n").unwrap();

    let base_s = base.to_string_lossy().to_string();
    let env_s = env.to_string_lossy().to_string();

    let first = stdout_of(capsync().args(["--config", &base_s, "--config", &env_s, "config-hash"]));
    let again = stdout_of(capsync().args(["--config", &base_s, "--config", &env_s, "config-hash"]));
    let reversed =
        stdout_of(capsync().args(["--config", &env_s, "--config", &base_s, "config-hash"]));

    assert!(first.starts_with("config_hash="));
    assert!(first.contains(r#""timeout_secs":5"#));
    assert_eq!(first, again);
    assert_ne!(first, reversed);
}

#[test]
fn registry_lookup_by_tag_prints_definition() {
    let tmp = tempfile::tempdir().unwrap();
    write_definitions(tmp.path());
    let dir = tmp.path().to_string_lossy().to_string();

    let out = stdout_of(capsync().args([
        "registry",
        "lookup",
        "--definitions-dir",
        &dir,
        "--tag",
        "RHEL for x86",
    ]));
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["id"], "rhel-for-x86");
}

#[test]
fn registry_lookup_by_engineering_id_and_product_name() {
    let tmp = tempfile::tempdir().unwrap();
    write_definitions(tmp.path());
    let dir = tmp.path().to_string_lossy().to_string();

    capsync()
        .args(["registry", "lookup", "--definitions-dir", &dir, "--engineering-id", "290"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""id": "rosa""#));

    capsync()
        .args([
            "registry",
            "lookup",
            "--definitions-dir",
            &dir,
            "--product-name",
            "Red Hat OpenShift Service on AWS",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""id": "rosa""#));
}

#[test]
fn registry_lookup_miss_exits_non_zero() {
    let tmp = tempfile::tempdir().unwrap();
    write_definitions(tmp.path());
    let dir = tmp.path().to_string_lossy().to_string();

    capsync()
        .args(["registry", "lookup", "--definitions-dir", &dir, "--role", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no subscription definition matches role 'Nope'"));
}

#[test]
fn registry_lookup_rejects_two_keys() {
    capsync()
        .args(["registry", "lookup", "--tag", "rosa", "--engineering-id", "290"])
        .assert()
        .failure();
}

#[test]
fn registry_service_types_lists_each_once() {
    let tmp = tempfile::tempdir().unwrap();
    write_definitions(tmp.path());
    let dir = tmp.path().to_string_lossy().to_string();

    let out = stdout_of(capsync().args(["registry", "service-types", "--definitions-dir", &dir]));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec!["RHEL System", "rosa Instance"]);
}

#[test]
fn db_status_reads_url_from_configured_env_var() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = tmp.path().join("base.yaml");
    fs::write(
        &cfg,
        "registry:\n  definitions_dir: defs\nupstream:\n  base_url: http://catalog.local\n\
         database:\n  url_env: CAPSYNC_CLI_TEST_DB_URL\n  max_connections: 2\n",
    )
    .unwrap();
    let cfg_s = cfg.to_string_lossy().to_string();

    // The default variable is set, but the config names a different one.
    capsync()
        .env("CAPSYNC_DATABASE_URL", "postgres://localhost:1/never_used")
        .env_remove("CAPSYNC_CLI_TEST_DB_URL")
        .args(["--config", &cfg_s, "db", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CAPSYNC_CLI_TEST_DB_URL"));
}
