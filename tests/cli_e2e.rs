//! End-to-end CLI tests for the mdpdf binary.

use assert_cmd::Command;
use assert_cmd::prelude::OutputAssertExt;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

fn mdpdf(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mdpdf").unwrap();
    cmd.current_dir(temp_dir.path());
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let temp_dir = TempDir::new().unwrap();
    mdpdf(&temp_dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("remote images"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let temp_dir = TempDir::new().unwrap();
    mdpdf(&temp_dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mdpdf"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let temp_dir = TempDir::new().unwrap();
    mdpdf(&temp_dir)
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_stdin_without_images_echoes_document() {
    let temp_dir = TempDir::new().unwrap();
    let text = "# Notes\n\n![local](a.png)\n";
    mdpdf(&temp_dir)
        .args(["-q", "-w", "img"])
        .write_stdin(text)
        .assert()
        .success()
        .stdout(text);
}

#[test]
fn test_binary_missing_input_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    mdpdf(&temp_dir)
        .args(["-q", "does-not-exist.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.md"));
}

#[test]
fn test_binary_invalid_config_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("bad.json"), "{ not json").unwrap();
    mdpdf(&temp_dir)
        .args(["-q", "--config", "bad.json"])
        .write_stdin("text")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.json"));
}

#[tokio::test]
async fn test_binary_localizes_images_into_output_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/chart.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .set_body_bytes(b"png-bytes".to_vec()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let missing = format!("{}/missing.png", server.uri());
    let input = format!("![c]({}/chart.png)\n![m]({missing})\n", server.uri());
    std::fs::write(temp_dir.path().join("doc.md"), &input).unwrap();

    let work_dir = temp_dir.path().join("img");
    let out_path = temp_dir.path().join("out.md");
    let mut cmd = mdpdf(&temp_dir);
    cmd.args(["doc.md", "-o", "out.md", "-w"]).arg(&work_dir);
    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap();
    output
        .assert()
        .success()
        .stderr(predicate::str::contains("could not be fetched"));

    let written = std::fs::read_to_string(&out_path).unwrap();
    assert!(!written.contains("/chart.png"), "{written}");
    assert!(written.contains(&format!("![m]({missing})")));
    assert_eq!(std::fs::read_dir(&work_dir).unwrap().count(), 1);
}

#[tokio::test]
async fn test_binary_cleanup_flag_removes_work_dir() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/a.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .set_body_bytes(b"png".to_vec()),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let work_dir = temp_dir.path().join("img");
    let mut cmd = mdpdf(&temp_dir);
    cmd.args(["-q", "--cleanup", "-w"])
        .arg(&work_dir)
        .write_stdin(format!("![a]({}/a.png)", server.uri()));
    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap();
    output.assert().success().stdout(predicate::str::contains("![a]("));

    assert!(!work_dir.exists());
}
