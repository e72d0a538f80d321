use assert_cmd::Command;
use predicates::prelude::*;

use super::fixture::CliFixture;

#[test]
fn test_cli_help() {
    Command::cargo_bin("attic")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("attic")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_put_get_history_workflow() {
    let fixture = CliFixture::new();
    let v1 = fixture.write_input("v1.txt", "hello");
    let v2 = fixture.write_input("v2.txt", "world");

    let put = fixture.ok(&["put", "docA/file.txt", v1.to_str().unwrap()]);
    assert_eq!(put["version"], "1.1");
    assert_eq!(put["outcome"]["atomic"], true);

    let put = fixture.ok(&[
        "put",
        "docA/file.txt",
        v2.to_str().unwrap(),
        "--author",
        "bob",
    ]);
    assert_eq!(put["version"], "1.2");

    let get = fixture.ok(&["get", "docA/file.txt"]);
    assert_eq!(get["content"], "world");
    assert_eq!(get["metadata"]["author"], "bob");

    let old = fixture.ok(&["get", "docA/file.txt", "--version", "1.1"]);
    assert_eq!(old["content"], "hello");

    let history = fixture.ok(&["history", "docA/file.txt"]);
    assert_eq!(history["count"], 2);
    assert_eq!(history["current"], "1.2");

    let ls = fixture.ok(&["ls", "docA"]);
    assert_eq!(ls["attachments"], serde_json::json!(["file.txt"]));
}

#[test]
fn test_rm_trash_restore_purge_workflow() {
    let fixture = CliFixture::new();
    let input = fixture.write_input("in.txt", "hello");
    fixture.ok(&["put", "docA/file.txt", input.to_str().unwrap()]);

    let rm = fixture.ok(&["rm", "docA/file.txt", "--deleter", "alice"]);
    let key = rm["deleted_key"].as_str().unwrap().to_string();
    assert!(key.starts_with("docA/file.txt@"));

    let trash = fixture.ok(&["trash", "docA"]);
    assert_eq!(trash["count"], 1);
    assert_eq!(trash["records"][0]["key"], key.as_str());
    assert_eq!(trash["records"][0]["deleter"], "alice");

    let restore = fixture.ok(&["restore", &key]);
    assert_eq!(restore["reference"], "docA/file.txt");
    let get = fixture.ok(&["get", "docA/file.txt"]);
    assert_eq!(get["content"], "hello");

    // A live attachment is only replaced with --force.
    let (output, value) = fixture.run_json(&["restore", &key]);
    assert!(!output.status.success());
    assert!(value["status"]["error"].is_object());
    fixture.ok(&["restore", &key, "--force"]);

    fixture.ok(&["purge", &key]);
    let trash = fixture.ok(&["trash", "docA/file.txt"]);
    assert_eq!(trash["count"], 0);
}

#[test]
fn test_missing_attachment_exits_with_not_found() {
    let fixture = CliFixture::new();
    let (output, value) = fixture.run_json(&["get", "docA/missing.txt"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(value["data"].is_null());
    assert!(value["status"]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("docA/missing.txt"));
}

#[test]
fn test_human_errors_go_to_stderr() {
    let fixture = CliFixture::new();
    let output = fixture.run(&["rm", "docA/missing.txt"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("docA/missing.txt"));
}

#[test]
fn test_plan_reports_degraded_configuration() {
    let fixture = CliFixture::new();
    std::fs::write(
        fixture.root().join("attic.toml"),
        "[metadata]\nbackend = \"sqlite\"\n\n[filesystem]\nrequire_lock = true\n",
    )
    .unwrap();

    let plan = fixture.ok(&["plan"]);
    let operations = plan["operations"].as_array().unwrap();
    let save = operations
        .iter()
        .find(|entry| entry["operation"] == "save")
        .unwrap();
    assert_eq!(save["atomic"], false);
    let load = operations
        .iter()
        .find(|entry| entry["operation"] == "load")
        .unwrap();
    assert_eq!(load["atomic"], false);

    let output = fixture.run(&["plan"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("degraded"));
}

#[test]
fn test_plan_with_default_configuration_is_atomic() {
    let fixture = CliFixture::new();
    let plan = fixture.ok(&["plan"]);
    assert_eq!(plan["recycle_bin"], true);
    assert!(plan["operations"]
        .as_array()
        .unwrap()
        .iter()
        .all(|entry| entry["atomic"] == true));
}

#[test]
fn test_invalid_reference_is_rejected() {
    let fixture = CliFixture::new();
    let output = fixture.run(&["get", "no-slash"]);
    assert!(!output.status.success());
}
