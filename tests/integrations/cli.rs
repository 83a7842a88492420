//! Runs the binary end to end with only the CSV export enabled.

#[path = "../helpers/mod.rs"]
mod helpers;

use assert_cmd::Command;
use helpers::write_config;
use predicates::prelude::*;
use serde_json::json;

fn command() -> Command {
    let mut cmd = Command::cargo_bin("scrummage-connectors").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_dispatches_finding_to_csv() {
    let sink_config = write_config(&json!({ "csv": [{ "use-csv": true }] }));
    let output = tempfile::tempdir().unwrap();

    command()
        .arg("--sink-config")
        .arg(sink_config.path())
        .arg("--output-dir")
        .arg(output.path())
        .args(["--title", "Leaked credentials"])
        .args(["--plugin", "Pastebin Search"])
        .args(["--domain", "example.com"])
        .args(["--link", "https://pastebin.com/abc"])
        .args(["--task-id", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("csv: delivered"))
        .stdout(predicate::str::contains("slack: disabled"));

    let csv = std::fs::read_to_string(output.path().join("Pastebin SearchOutput.csv")).unwrap();
    assert!(csv.starts_with("Title,Plugin,Domain,Link,Created At,Output File,Result Type,Task ID"));
    assert!(csv.contains("Leaked credentials,Pastebin Search,example.com,https://pastebin.com/abc"));
}

#[test]
fn test_missing_sink_config_disables_every_sink() {
    let output = tempfile::tempdir().unwrap();

    command()
        .arg("--sink-config")
        .arg(output.path().join("absent.json"))
        .arg("--output-dir")
        .arg(output.path())
        .args(["--title", "t", "--plugin", "p", "--domain", "d", "--link", "l"])
        .assert()
        .success()
        .stdout(predicate::str::contains("csv: disabled"))
        .stdout(predicate::str::contains("delivered").not());

    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_finding_arguments_is_a_usage_error() {
    command().args(["--title", "t"]).assert().failure();
}

#[test]
fn test_malformed_settings_file_exits_with_error() {
    let settings = helpers::write_raw_config("log_level = [");

    command()
        .arg("--config")
        .arg(settings.path())
        .args(["--title", "t", "--plugin", "p", "--domain", "d", "--link", "l"])
        .assert()
        .code(1);
}
