//! Integration tests for the `feeder` CLI binary.
//!
//! Argument parsing, help output, shell completions and error handling run
//! without a backend; the end-to-end cases drive the binary against a
//! wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `feeder` binary with env isolation.
///
/// Clears all `FEEDER_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn feeder_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("feeder");
    cmd.env("HOME", "/tmp/feeder-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/feeder-cli-test-nonexistent")
        .env_remove("FEEDER_PROFILE")
        .env_remove("FEEDER_API_URL")
        .env_remove("FEEDER_WS_URL")
        .env_remove("FEEDER_USERNAME")
        .env_remove("FEEDER_PASSWORD")
        .env_remove("FEEDER_OUTPUT")
        .env_remove("FEEDER_INSECURE")
        .env_remove("FEEDER_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Command pointed at `server` with credentials supplied through the env.
fn backend_cmd(server: &MockServer) -> assert_cmd::Command {
    let mut cmd = feeder_cmd();
    cmd.env("FEEDER_API_URL", server.uri())
        .env("FEEDER_USERNAME", "ana")
        .env("FEEDER_PASSWORD", "hunter2");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run a blocking command off the async test runtime.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

/// Mount login + user lookup for "ana" owning device "feeder-1".
async fn mount_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "t0ken",
            "token_type": "bearer"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/ana"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "username": "ana",
            "devices": [{ "id": 7, "device_name": "feeder-1", "user_id": 1 }]
        })))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = feeder_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    feeder_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("bird feeder")
            .and(predicate::str::contains("food"))
            .and(predicate::str::contains("species"))
            .and(predicate::str::contains("visitors"))
            .and(predicate::str::contains("feed")),
    );
}

#[test]
fn test_version_flag() {
    feeder_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("feeder"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    feeder_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    feeder_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = feeder_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_food_without_config_fails() {
    feeder_cmd()
        .arg("food")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config").or(predicate::str::contains("Configuration")));
}

#[test]
fn test_unknown_profile_is_usage_error() {
    feeder_cmd()
        .args(["--profile", "cabin", "food"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cabin"));
}

#[test]
fn test_missing_password_is_auth_error() {
    feeder_cmd()
        .args(["--api-url", "http://127.0.0.1:9", "--username", "ana", "food"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("credentials"));
}

#[test]
fn test_config_show_no_config() {
    // `config show` renders the default config when no file exists
    feeder_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_invalid_output_format() {
    let output = feeder_cmd()
        .args(["--output", "invalid", "food"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_visitors_subcommands_exist() {
    feeder_cmd()
        .args(["visitors", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("toggle"))
                .and(predicate::str::contains("set")),
        );
}

#[test]
fn test_config_subcommands_exist() {
    feeder_cmd()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("init")
                .and(predicate::str::contains("show"))
                .and(predicate::str::contains("profiles"))
                .and(predicate::str::contains("set-password")),
        );
}

// ── Config file round-trip ──────────────────────────────────────────

#[test]
fn test_config_set_then_profiles() {
    let home = tempfile::tempdir().unwrap();
    let with_home = |args: &[&str]| {
        let mut cmd = feeder_cmd();
        cmd.env("HOME", home.path())
            .env("XDG_CONFIG_HOME", home.path())
            .args(args);
        cmd
    };

    with_home(&["--profile", "cabin", "config", "set", "api_url", "http://cabin:8000"])
        .assert()
        .success();
    with_home(&["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cabin"));
    with_home(&["config", "use", "cabin"]).assert().success();
    with_home(&["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cabin *"));
}

// ── Against a mock backend ──────────────────────────────────────────

#[tokio::test]
async fn test_food_reports_percent_as_json() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("GET"))
        .and(path("/devices/feeder-1/foodLevel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "foodLevel": 0.05 })))
        .mount(&server)
        .await;

    let mut cmd = backend_cmd(&server);
    cmd.args(["-o", "json-compact", "food"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["percent"], 5);
    assert_eq!(report["low"], true);
}

#[tokio::test]
async fn test_login_prints_device() {
    let server = MockServer::start().await;
    mount_session(&server).await;

    let mut cmd = backend_cmd(&server);
    cmd.args(["-o", "plain", "login"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "feeder-1");
}

#[tokio::test]
async fn test_rejected_login_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Incorrect username or password"
        })))
        .mount(&server)
        .await;

    let output = run({
        let mut cmd = backend_cmd(&server);
        cmd.arg("login");
        cmd
    })
    .await;

    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}

#[tokio::test]
async fn test_species_table_lists_leaderboard() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("GET"))
        .and(path("/visits/topSpecies"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "topSpecies": [
                { "common_name": "Robin", "num_visits": 9 },
                { "common_name": "Wren", "num_visits": 3 }
            ]
        })))
        .mount(&server)
        .await;

    let mut cmd = backend_cmd(&server);
    cmd.args(["species", "--limit", "2"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Robin") && stdout.contains("Wren"), "{stdout}");
}

#[tokio::test]
async fn test_visitors_toggle_starts_from_device_list() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("GET"))
        .and(path("/devices/feeder-1/unwelcomeVisitors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "unwelcomeVisitors": ["bear", "cat"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/devices/feeder-1/unwelcomeVisitors"))
        .and(body_json(json!({ "unwelcomeVisitors": ["bear", "cat", "dog"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = backend_cmd(&server);
    cmd.args(["-o", "plain", "visitors", "toggle", "dog"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("dog on"), "{stdout}");
}

#[tokio::test]
async fn test_toggle_unknown_visitor_is_not_found() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("GET"))
        .and(path("/devices/feeder-1/unwelcomeVisitors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "unwelcomeVisitors": ["bear"]
        })))
        .mount(&server)
        .await;

    let mut cmd = backend_cmd(&server);
    cmd.args(["visitors", "toggle", "fox"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}
