//! CLI smoke tests for the jsonapi-server binary: help output, configuration
//! validation and one-shot requests.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::timeout;

fn run_server_binary(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_jsonapi-server"))
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute jsonapi-server")
}

/// Config rooted in `dir`, with console logging quietened.
fn write_config(dir: &Path, extra: &str) -> String {
    let path = dir.join("config.yaml");
    let content = format!(
        r#"
server:
  home_dir: "{home}"
  host: "127.0.0.1"
  port: 0
logging:
  default:
    console_level: error
    file: ""
{extra}
"#,
        home = dir.join("home").display()
    );
    std::fs::write(&path, content).expect("Failed to write config file");
    path.to_string_lossy().to_string()
}

#[test]
fn test_cli_help_command() {
    let output = run_server_binary(&["--help"]);
    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    for word in ["run", "check", "request", "--config", "--print-config"] {
        assert!(stdout.contains(word), "Should mention {word}");
    }
}

#[test]
fn test_cli_version_command() {
    let output = run_server_binary(&["--version"]);
    assert!(output.status.success(), "Version command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("jsonapi-server"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_invalid_command() {
    let output = run_server_binary(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "Should report the bad subcommand");
}

#[test]
fn test_cli_missing_config_file() {
    for flag in ["--config", "-c"] {
        let output = run_server_binary(&[flag, "/nonexistent/config.yaml", "check"]);
        assert!(!output.status.success(), "Should fail with missing config");

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains("config file not found"),
            "Should mention the missing file: {stderr}"
        );
    }
}

#[test]
fn test_cli_invalid_yaml() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("invalid.yaml");
    std::fs::write(&config_path, "invalid: yaml: content: [unclosed").unwrap();

    let output = run_server_binary(&["--config", config_path.to_str().unwrap(), "check"]);
    assert!(!output.status.success(), "Should fail with invalid YAML");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config"), "Should mention the config: {stderr}");
}

#[test]
fn test_cli_unknown_config_key_is_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), "api:\n  page_size: 10\n");

    let output = run_server_binary(&["--config", &config, "check"]);
    assert!(!output.status.success(), "Unknown api key should fail");
}

#[test]
fn test_cli_check_lists_resources() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), "");

    let output = run_server_binary(&["--config", &config, "check"]);
    if !output.status.success() {
        eprintln!("STDERR: {}", String::from_utf8_lossy(&output.stderr));
    }
    assert!(output.status.success(), "Should succeed with valid config");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration check passed"));
    assert!(stdout.contains("Resources: comments, posts, users"));
}

#[test]
fn test_cli_print_config_applies_overrides() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), "api:\n  base_path: /v1\n");

    let output = run_server_binary(&["--config", &config, "--port", "9911", "--print-config"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("port: 9911"), "{stdout}");
    assert!(stdout.contains("base_path: /v1"), "{stdout}");
}

#[test]
fn test_cli_request_prints_document() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), "");

    let output = run_server_binary(&[
        "--config",
        &config,
        "request",
        "/api/posts/1?include=author&fields[users]=name",
    ]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("HTTP 200"));

    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["data"]["type"], "posts");
    assert_eq!(body["data"]["id"], "1");
    assert_eq!(body["included"][0]["attributes"]["name"], "Ann");
}

#[test]
fn test_cli_request_with_body_and_headers() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), "");

    let output = run_server_binary(&[
        "--config",
        &config,
        "request",
        "-X",
        "post",
        "/api/users",
        "-H",
        "x-blog-role: admin",
        "--data",
        r#"{"data": {"type": "users", "attributes": {"name": "Dee", "email": "dee@example.com"}}}"#,
    ]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("HTTP 201"));

    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["data"]["attributes"]["email"], "dee@example.com");
}

#[test]
fn test_cli_request_rejects_malformed_header() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), "");

    let output = run_server_binary(&["--config", &config, "request", "/api/posts", "-H", "nocolon"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("name: value"));
}

#[tokio::test]
async fn test_cli_run_keeps_serving() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), "");

    let mut child = tokio::process::Command::new(env!("CARGO_BIN_EXE_jsonapi-server"))
        .args(["--config", &config, "run"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn jsonapi-server");

    // Still running after startup means the listener came up.
    let status = timeout(Duration::from_secs(3), child.wait()).await;
    assert!(status.is_err(), "server exited early: {status:?}");
    child.kill().await.expect("kill server");
}
