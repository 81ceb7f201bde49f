// SPDX-License-Identifier: Apache-2.0

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

/// Builds a command isolated from the user's config file.
fn wayfare(config_home: &tempfile::TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("wayfare");
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_version() {
    let mut cmd = cargo_bin_cmd!("wayfare");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("wayfare"));
}

#[test]
fn test_help_contains_search() {
    let mut cmd = cargo_bin_cmd!("wayfare");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("search"));
}

#[test]
fn test_search_requires_route() {
    let mut cmd = cargo_bin_cmd!("wayfare");
    cmd.args(["search", "--date", "2024-12-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--from"));
}

#[test]
fn test_invalid_date_is_rejected() {
    let home = tempfile::tempdir().expect("tempdir");
    wayfare(&home)
        .args(["search", "--from", "DEL", "--to", "BOM", "--date", "2024-13-45"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid travel date '2024-13-45'"))
        .stderr(predicate::str::contains("Tip: Use a date like 2024-12-01."));
}

#[test]
fn test_zero_passengers_is_rejected() {
    let home = tempfile::tempdir().expect("tempdir");
    wayfare(&home)
        .args(["search", "--from", "DEL", "--to", "BOM", "--date", "2024-12-01"])
        .args(["--passengers", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("At least one passenger is required"));
}

#[test]
fn test_unreachable_backend_reports_network_tip() {
    let home = tempfile::tempdir().expect("tempdir");
    wayfare(&home)
        .env("WAYFARE_RETRY__MAX_ATTEMPTS", "1")
        .args(["search", "--from", "DEL", "--to", "BOM", "--date", "2024-12-01"])
        .args(["--endpoint", "http://127.0.0.1:1/api/flights/search"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Tip: Could not reach the flight service"))
        .stderr(predicate::str::contains("offline").not());
}

#[test]
fn test_invalid_config_is_reported() {
    let home = tempfile::tempdir().expect("tempdir");
    wayfare(&home)
        .env("WAYFARE_RETRY__MAX_ATTEMPTS", "0")
        .args(["search", "--from", "DEL", "--to", "BOM", "--date", "2024-12-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_attempts"));
}
