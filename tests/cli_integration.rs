// Integration tests for CLI commands
// These tests run the real binary against a temporary config and data directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn get_binary_path() -> &'static str {
    env!("CARGO_BIN_EXE_silentmatch")
}

/// Write a config whose data directory lives inside `root`.
fn write_config(root: &Path) -> PathBuf {
    let config_path = root.join("config.toml");
    fs::write(
        &config_path,
        format!(
            "[storage]\ndata_dir = \"{}\"\n\n[logging]\nlevel = \"warn\"\n",
            root.join("state").display()
        ),
    )
    .unwrap();
    config_path
}

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(get_binary_path())
        .args(args)
        .arg("--config")
        .arg(config)
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Register a member and pull its API key out of the command output.
fn register(config: &Path, name: &str) -> String {
    let output = run(config, &["register", "--name", name]);
    assert!(output.status.success());
    stdout(&output)
        .lines()
        .find_map(|line| line.trim().strip_prefix("API key: "))
        .map(str::to_string)
        .expect("API key in register output")
}

#[test]
fn test_cli_help() {
    let output = Command::new(get_binary_path())
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("Operator CLI for the SilentMatch"));
    for command in ["init", "register", "clients", "rotate", "status", "ingest", "verify"] {
        assert!(stdout.contains(command), "missing {command}");
    }
}

#[test]
fn test_cli_version() {
    let output = Command::new(get_binary_path())
        .arg("version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert!(stdout(&output).contains("silentmatch"));
}

#[test]
fn test_cli_register_requires_name() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());

    let output = run(&config, &["register"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("name") || stderr.contains("required"));
}

#[test]
fn test_cli_init_creates_state() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());

    let output = run(&config, &["init"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Key version: v1"));

    let state = temp_dir.path().join("state");
    assert!(state.join("server_keys.json").exists());
    assert!(state.join("ledgers").join("v1.json").exists());
}

#[test]
#[cfg(target_os = "linux")]
fn test_cli_missing_config_is_generated() {
    let temp_dir = TempDir::new().unwrap();
    let home = temp_dir.path();

    let output = Command::new(get_binary_path())
        .arg("init")
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let config = home.join("config").join("silentmatch").join("config.toml");
    assert!(config.exists());
    assert!(fs::read_to_string(&config).unwrap().contains("[storage]"));
    assert!(home
        .join("data")
        .join("silentmatch")
        .join("server_keys.json")
        .exists());
}

#[test]
fn test_cli_invalid_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    fs::write(&config, "[storage\n").unwrap();

    let output = run(&config, &["init"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn test_cli_full_consortium_flow() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());

    let bank_a = register(&config, "Bank A");
    let bank_b = register(&config, "Bank B");
    assert_eq!(bank_a.len(), 32);
    assert_ne!(bank_a, bank_b);

    let fraud = temp_dir.path().join("fraud.json");
    fs::write(
        &fraud,
        r#"[{"email": "badguy@gmail.com", "risk": "MONEY_LAUNDERING", "role": "PERPETRATOR"}]"#,
    )
    .unwrap();
    let output = run(
        &config,
        &["ingest", "--api-key", &bank_a, "--input", fraud.to_str().unwrap()],
    );
    assert!(output.status.success());
    assert!(stdout(&output).contains("Submitted 1 signatures under key v1"));

    let applicants = temp_dir.path().join("applicants.json");
    fs::write(
        &applicants,
        r#"[{"id": "APP-1", "email": "BadGuy@gmail.com"}, {"id": "APP-2", "email": "ok@example.com"}]"#,
    )
    .unwrap();
    let output = run(
        &config,
        &["verify", "--api-key", &bank_b, "--input", applicants.to_str().unwrap()],
    );
    assert!(output.status.success());
    let report = stdout(&output);
    assert!(report.contains("APP-1: ⛔ HIGH RISK - BLOCK"));
    assert!(report.contains("APP-2: ✅ CLEAN"));
    assert!(report.contains("1 of 2 applicants flagged"));

    // The raw identity never reaches node state.
    let ledger = fs::read_to_string(temp_dir.path().join("state/ledgers/v1.json")).unwrap();
    assert!(!ledger.contains("badguy"));

    let output = run(&config, &["rotate"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("v1 -> v2"));

    let output = run(&config, &["status", "--api-key", &bank_a]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("OUTDATED"));

    let output = run(
        &config,
        &["verify", "--api-key", &bank_a, "--input", applicants.to_str().unwrap()],
    );
    assert!(output.status.success());
    let report = stdout(&output);
    assert!(report.contains("Degraded"));
    assert!(report.contains("0 of 2 applicants flagged"));
}

#[test]
fn test_cli_ingest_with_unknown_key_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let fraud = temp_dir.path().join("fraud.json");
    fs::write(
        &fraud,
        r#"[{"phone": "514-555-0000", "risk": "CREDIT_DEFAULT", "role": "SUSPECT"}]"#,
    )
    .unwrap();

    let output = run(
        &config,
        &["ingest", "--api-key", "deadbeef", "--input", fraud.to_str().unwrap()],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid API key"));
}
