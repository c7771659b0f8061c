//! CLI integration tests
//!
//! Runs the drc-sim-server binary using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;

fn server() -> Command {
    Command::cargo_bin("drc-sim-server")
        .expect("Failed to locate drc-sim-server binary - ensure it's built before running tests")
}

#[test]
fn test_cli_help() {
    server()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("drc-sim-server"))
        .stdout(predicate::str::contains("--assume-yes"));
}

#[test]
fn test_cli_version() {
    server()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("drc-sim-server"));
}

#[test]
fn test_cli_rejects_unknown_region() {
    server()
        .args(["--region", "EU"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown region"));
}

#[test]
fn test_cli_wii_u_requires_normal() {
    server().args(["--wii-u", "wlan1"]).assert().failure();
}

#[test]
fn test_cli_missing_config_file() {
    server()
        .args(["--config", "/nonexistent/drc-sim/config.toml"])
        .write_stdin("quit\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_cli_status_then_quit() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        format!(
            "credentials_path = {:?}\nlog_dir = {:?}\n\n[network]\nsysfs_root = {:?}\nnmcli = \"/nonexistent/nmcli\"\n",
            dir.path().join("connect_to_wii_u.conf"),
            dir.path().join("log"),
            dir.path(),
        ),
    )
    .unwrap();

    server()
        .args(["--json", "--config"])
        .arg(&config)
        .write_stdin("status\nstop\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\":\"status\""))
        .stdout(predicate::str::contains("DISCONNECTED"))
        .stdout(predicate::str::contains("Server is not running."));
}

#[test]
fn test_cli_autostart_reports_awaiting_link() {
    let dir = tempfile::tempdir().unwrap();
    let sysfs = dir.path().join("net");
    std::fs::create_dir_all(sysfs.join("wlan1/wireless")).unwrap();
    std::fs::create_dir_all(sysfs.join("eth0")).unwrap();
    std::fs::write(sysfs.join("wlan1/address"), "00:c0:ca:12:34:56\n").unwrap();
    std::fs::write(sysfs.join("eth0/address"), "52:54:00:aa:bb:cc\n").unwrap();

    let credentials = dir.path().join("connect_to_wii_u.conf");
    std::fs::write(&credentials, "ctrl_interface=/var/run/wpa_supplicant_drc\n").unwrap();

    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        format!(
            "credentials_path = {:?}\nlog_dir = {:?}\n\n[network]\nsysfs_root = {:?}\nnmcli = \"/nonexistent/nmcli\"\n\n[wpa]\nbinary = \"/nonexistent/wpa_supplicant_drc\"\n",
            credentials,
            dir.path().join("log"),
            sysfs,
        ),
    )
    .unwrap();

    server()
        .args(["--json", "--wii-u", "wlan1", "--normal", "eth0", "--config"])
        .arg(&config)
        .write_stdin("quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"phase\":\"awaiting_link\""));
}
