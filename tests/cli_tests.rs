//! CLI Integration Tests for the PICCE API
//!
//! Tests the command-line interface functionality including the init and
//! config commands.

use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// Helper to run picce-server with arguments
fn run_picce(args: &[&str], working_dir: Option<&str>) -> std::process::Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_picce-server"));
    cmd.args(args).env_remove("JWT_SECRET");

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    cmd.output().expect("Failed to execute command")
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_command() {
    let output = run_picce(&["--help"], None);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("PICCE API"));
    assert!(stdout.contains("Usage"));
    assert!(stdout.contains("init"));
    assert!(stdout.contains("config"));
}

#[test]
fn test_version_command() {
    let output = run_picce(&["--version"], None);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("picce-server"));
}

#[test]
fn test_init_help() {
    let output = run_picce(&["init", "--help"], None);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--force"));
    assert!(stdout.contains("--host"));
    assert!(stdout.contains("--port"));
    assert!(stdout.contains("--no-sign-up"));
}

// =============================================================================
// Init Command Tests
// =============================================================================

#[test]
fn test_init_creates_project_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path().to_str().unwrap();

    let output = run_picce(&["--no-color", "init", temp_path], None);
    assert!(output.status.success());

    assert!(temp_dir.path().join("picce.toml").exists());
    assert!(temp_dir.path().join(".env.example").exists());
    assert!(temp_dir.path().join(".gitignore").exists());
    assert!(temp_dir.path().join("data").is_dir());

    let env_example = fs::read_to_string(temp_dir.path().join(".env.example")).unwrap();
    assert!(env_example.contains("JWT_SECRET"));
}

#[test]
fn test_init_with_custom_host_port() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path().to_str().unwrap();

    let output = run_picce(
        &["init", temp_path, "--host", "0.0.0.0", "--port", "8080"],
        None,
    );
    assert!(output.status.success());

    let content = fs::read_to_string(temp_dir.path().join("picce.toml")).unwrap();
    assert!(content.contains("host = \"0.0.0.0\""));
    assert!(content.contains("port = 8080"));
    assert!(content.contains("allow_sign_up = true"));
}

#[test]
fn test_init_no_sign_up_flag() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path().to_str().unwrap();

    let output = run_picce(&["init", temp_path, "--no-sign-up"], None);
    assert!(output.status.success());

    let content = fs::read_to_string(temp_dir.path().join("picce.toml")).unwrap();
    assert!(content.contains("allow_sign_up = false"));
}

#[test]
fn test_init_keeps_existing_config_without_force() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path().to_str().unwrap();
    let config_path = temp_dir.path().join("picce.toml");

    fs::write(&config_path, "# hand-edited\n").unwrap();

    let output = run_picce(&["--no-color", "init", temp_path], None);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("already exists"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "# hand-edited\n");
}

#[test]
fn test_init_with_force_overwrites() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path().to_str().unwrap();
    let config_path = temp_dir.path().join("picce.toml");

    fs::write(&config_path, "# hand-edited\n").unwrap();

    let output = run_picce(&["init", temp_path, "--force"], None);
    assert!(output.status.success());

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[auth]"));
}

// =============================================================================
// Config Command Tests
// =============================================================================

#[test]
fn test_config_command_with_valid_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path().to_str().unwrap();

    run_picce(&["init", temp_path], None);

    let output = Command::new(env!("CARGO_BIN_EXE_picce-server"))
        .args(["--no-color", "config", "--validate"])
        .env("JWT_SECRET", "a-test-secret-that-is-long-enough-to-sign")
        .current_dir(temp_path)
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("token_expiry: 3600s (1h)"));
    assert!(stdout.contains("JWT_SECRET: set (41 bytes)"));
    assert!(!stdout.contains("a-test-secret-that-is-long-enough-to-sign"));
    assert!(stdout.contains("roles: GUEST < USER < APPLIER"));
    assert!(stdout.contains("Configuration is valid"));
}

#[test]
fn test_config_validate_without_secret_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path().to_str().unwrap();

    run_picce(&["init", temp_path], None);

    let output = run_picce(&["--no-color", "config", "--validate"], Some(temp_path));
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("JWT_SECRET: missing"));
}

#[test]
fn test_config_command_missing_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path().to_str().unwrap();

    let output = run_picce(&["config"], Some(temp_path));
    assert!(!output.status.success());
}
