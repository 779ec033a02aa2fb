//! Integration tests against the live GitHub API.
//!
//! These need network access and a token in `GITHUB_TOKEN`. Gated behind the
//! `network_tests` feature:
//! ```sh
//! GITHUB_TOKEN=... cargo test --features network_tests -p repo-pulse-lib --test github_live_integration
//! ```

#![cfg(feature = "network_tests")]

use repo_pulse_lib::Host;
use serde_json::Value;
use std::io::Cursor;

const REPO: &str = "rust-lang/rust";

/// Test host that captures output to in-memory buffers.
struct TestHost {
    output_buf: Vec<u8>,
    error_buf: Vec<u8>,
}

impl TestHost {
    const fn new() -> Self {
        Self {
            output_buf: Vec::new(),
            error_buf: Vec::new(),
        }
    }

    fn output_json(&self) -> Value {
        serde_json::from_slice(&self.output_buf).expect("output should be JSON")
    }
}

impl Host for TestHost {
    fn output(&mut self) -> impl std::io::Write {
        Cursor::new(&mut self.output_buf)
    }

    fn error(&mut self) -> impl std::io::Write {
        Cursor::new(&mut self.error_buf)
    }

    fn exit(&mut self, _code: i32) {}
}

#[tokio::test]
async fn test_live_repository_info() {
    let mut host = TestHost::new();
    repo_pulse_lib::run(&mut host, ["repo-pulse", "info", REPO]).await.unwrap();

    let value = host.output_json();
    assert_eq!(value["full_name"], REPO);
    assert!(value["stars"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_live_metrics() {
    let mut host = TestHost::new();
    repo_pulse_lib::run(&mut host, ["repo-pulse", "metrics", REPO, "--days", "3"]).await.unwrap();

    let value = host.output_json();
    assert_eq!(value["time_period_days"], 3);
    assert!(value["commit_count"].is_u64() || value["commit_count"].is_null());
}

#[tokio::test]
async fn test_live_series_has_one_point_per_day() {
    let mut host = TestHost::new();
    repo_pulse_lib::run(&mut host, ["repo-pulse", "series", REPO, "--days", "5"]).await.unwrap();

    let value = host.output_json();
    assert_eq!(value["points"].as_array().map(Vec::len), Some(5));
}
