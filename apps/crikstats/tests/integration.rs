//! Integration tests for crikstats CLI

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn config_file(simulator: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[general]
color = "never"

[simulator]
step_delay_ms = 0
download_chunks = 2
{simulator}
"#
    )
    .unwrap();
    file
}

fn crikstats(config: &NamedTempFile, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_crikstats"))
        .arg("--config")
        .arg(config.path())
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("CRIKSTATS_OUTPUT")
        .env_remove("CRIKSTATS_FEATURE_MODULE")
        .output()
        .expect("Failed to execute crikstats")
}

#[test]
fn test_cli_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_crikstats"))
        .arg("--version")
        .output()
        .expect("Failed to execute crikstats");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("crikstats"));
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_crikstats"))
        .arg("--help")
        .output()
        .expect("Failed to execute crikstats");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("On-demand player statistics module delivery"));
    assert!(stdout.contains("open"));
    assert!(stdout.contains("install"));
    assert!(stdout.contains("modules"));
    assert!(stdout.contains("uninstall"));
}

#[test]
fn test_cli_invalid_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_crikstats"))
        .arg("invalid-command")
        .output()
        .expect("Failed to execute crikstats");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn test_open_installs_then_opens() {
    let config = config_file("");
    let output = crikstats(&config, &["open", "player-18"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[OK]"));
    assert!(stdout.contains("player-18"));
    assert!(stdout.contains("opened after install"));
}

#[test]
fn test_open_preinstalled_json() {
    let config = config_file(r#"preinstalled = ["feature_player"]"#);
    let output = crikstats(&config, &["--json", "open", "player-18"]);

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["result"], "activation");
    assert_eq!(json["module"], "feature_player");
    assert_eq!(json["outcome"]["outcome"], "already_installed");
}

#[test]
fn test_open_with_provider_failure_exits_nonzero() {
    let config = config_file("fail_with = -6");
    let output = crikstats(&config, &["open", "player-18"]);

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    // the failed state is rendered before the outcome line
    let failed_at = stdout.find("❌ feature_player").unwrap();
    let outcome_at = stdout.find("[ERROR]").unwrap();
    assert!(failed_at < outcome_at);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("activation.install_incomplete"));
}

#[test]
fn test_install_json_lists_states() {
    let config = config_file("");
    let output = crikstats(&config, &["--json", "install", "feature_scores"]);

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["result"], "install_states");
    let states = json["states"].as_array().unwrap();
    assert_eq!(states.first().unwrap()["state"], "pending");
    assert_eq!(states.last().unwrap()["state"], "installed");
}

#[test]
fn test_rejected_install_exits_nonzero() {
    let config = config_file("reject_submission = true");
    let output = crikstats(&config, &["install", "feature_player"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("delivery.submission_failed"));
}

#[test]
fn test_modules_and_uninstall() {
    let config = config_file(r#"preinstalled = ["feature_news"]"#);

    let output = crikstats(&config, &["modules"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("feature_news"));

    let output = crikstats(&config, &["uninstall", "feature_news"]);
    assert!(output.status.success());

    let output = crikstats(&config, &["uninstall", "feature_player"]);
    assert!(!output.status.success());
}
