//! Integration tests for the fetchcache binary
//!
//! Each test points the binary at its own temporary cache directory.

use std::path::Path;
use std::process::{Command, Output};

use fetchcache::{CacheKey, DiskStore, EntryStore};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to run the CLI against `cache_dir` and capture output
fn run_cli(cache_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fetchcache"))
        .arg("--cache-dir")
        .arg(cache_dir)
        .args(args)
        .env_remove("FETCHCACHE_TTL_MS")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute fetchcache")
}

/// Async variant so a mock server on the same runtime keeps answering
async fn run_cli_async(cache_dir: &Path, args: &[&str]) -> Output {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_fetchcache"))
        .arg("--cache-dir")
        .arg(cache_dir)
        .args(args)
        .env_remove("FETCHCACHE_TTL_MS")
        .env_remove("RUST_LOG")
        .output()
        .await
        .expect("Failed to execute fetchcache")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = Command::new(env!("CARGO_BIN_EXE_fetchcache"))
        .arg("--help")
        .output()
        .expect("Failed to execute fetchcache");
    assert!(output.status.success(), "Expected --help to exit successfully");
    let out = stdout(&output);
    assert!(out.contains("fetchcache"), "Help should mention fetchcache");
    assert!(out.contains("invalidate"), "Help should list the invalidate command");
}

#[test]
fn test_list_on_empty_cache_prints_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_cli(temp_dir.path(), &["list"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_show_missing_key_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_cli(temp_dir.path(), &["show", "odds-nba"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("no entry for key 'odds-nba'"));
}

#[test]
fn test_invalidate_without_target_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_cli(temp_dir.path(), &["invalidate"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Nothing to invalidate"));
}

#[test]
fn test_invalidate_with_bad_pattern_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_cli(temp_dir.path(), &["invalidate", "--pattern", "(odds"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid pattern"));
}

#[test]
fn test_list_invalidate_and_clear_seeded_entries() {
    let temp_dir = TempDir::new().unwrap();
    let store = DiskStore::with_dir(temp_dir.path().to_path_buf());
    for key in ["odds-nba", "odds-nfl", "analytics-nba"] {
        store
            .save(key, fetchcache::CacheEntry::new(json!({ "key": key }), chrono::Utc::now()))
            .unwrap();
    }

    let listed = stdout(&run_cli(temp_dir.path(), &["list"]));
    let lines: Vec<&str> = listed.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("FRESH") && lines[0].ends_with("analytics-nba"));

    let output = run_cli(temp_dir.path(), &["invalidate", "--pattern", "^odds-"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("removed 2 entries"));
    assert_eq!(store.keys().unwrap(), vec!["analytics-nba".to_string()]);

    let output = run_cli(temp_dir.path(), &["invalidate", "analytics-nba"]);
    assert!(stdout(&output).contains("removed 1 entry"));

    store
        .save("odds-nhl", fetchcache::CacheEntry::new(json!(1), chrono::Utc::now()))
        .unwrap();
    let output = run_cli(temp_dir.path(), &["clear"]);
    assert!(output.status.success());
    assert!(store.keys().unwrap().is_empty());
}

#[tokio::test]
async fn test_get_serves_second_call_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/odds/nba"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "spread": -3.5 })))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let url = format!("{}/odds/nba", server.uri());

    let first = run_cli_async(temp_dir.path(), &["get", &url, "--ttl-ms", "60000"]).await;
    let second = run_cli_async(temp_dir.path(), &["get", &url, "--ttl-ms", "60000"]).await;

    assert!(first.status.success(), "stderr: {}", stderr(&first));
    assert!(second.status.success(), "stderr: {}", stderr(&second));
    assert_eq!(stdout(&first), stdout(&second));
    assert!(stdout(&first).contains("-3.5"));

    let expected_key = CacheKey::new("http").unwrap().param("url", &url).render();
    let show = run_cli_async(temp_dir.path(), &["show", &expected_key]).await;
    assert!(stdout(&show).contains("status:    FRESH"));

    let entry_path = DiskStore::<serde_json::Value>::with_dir(temp_dir.path().to_path_buf())
        .entry_path(&expected_key);
    assert!(entry_path.exists());
    assert!(stdout(&show).contains(&format!("file:      {}", entry_path.display())));
}

#[tokio::test]
async fn test_get_stale_fallback_after_failed_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/odds/nfl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "spread": 6.5 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/odds/nfl"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let url = format!("{}/odds/nfl", server.uri());
    let args = ["get", url.as_str(), "--key", "odds-nfl", "--ttl-ms", "0"];

    let first = run_cli_async(temp_dir.path(), &args).await;
    assert!(first.status.success(), "stderr: {}", stderr(&first));

    let failed = run_cli_async(temp_dir.path(), &args).await;
    assert!(!failed.status.success());
    assert!(stderr(&failed).contains("503"));

    let mut fallback_args = args.to_vec();
    fallback_args.push("--stale-fallback");
    let fallback = run_cli_async(temp_dir.path(), &fallback_args).await;
    assert!(fallback.status.success(), "stderr: {}", stderr(&fallback));
    assert!(stdout(&fallback).contains("6.5"));
}
