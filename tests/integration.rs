//! End-to-end runs of the `cqa` binary against mock Confluence and
//! chat-completion services.

use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn cqa_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cqa");
    path
}

async fn list_content(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("spaceKey").map(String::as_str) == Some("BROKEN") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "listing exploded").into_response();
    }
    let results = if params.get("start").map(String::as_str) == Some("0") {
        json!([
            { "title": "Onboarding", "body": { "storage": { "value": "<p>Ask for a laptop.</p><ul><li>Badge</li><li>VPN</li></ul>" } } },
            { "title": "Deploys", "body": { "storage": { "value": "<p>We deploy on <strong>Tuesdays</strong>.</p>" } } }
        ])
    } else {
        json!([])
    };
    Json(json!({ "results": results })).into_response()
}

async fn get_content() -> Json<Value> {
    Json(json!({ "title": "Single", "body": { "storage": { "value": "<p>Just this page.</p>" } } }))
}

async fn chat_completions(Json(body): Json<Value>) -> Json<Value> {
    let question = body["messages"][1]["content"].as_str().unwrap_or_default();
    let system = body["messages"][0]["content"].as_str().unwrap_or_default();
    let answer = if system.contains("Tuesdays") {
        format!("  You asked '{}'. Deploys happen on Tuesdays.  ", question)
    } else {
        format!("You asked '{}'.", question)
    };
    Json(json!({ "choices": [{ "message": { "role": "assistant", "content": answer } }] }))
}

/// Start both mock services; returns `(wiki_base_url, chat_endpoint)`.
async fn start_mocks() -> (String, String) {
    let app = Router::new()
        .route("/wiki/rest/api/content", get(list_content))
        .route("/wiki/rest/api/content/{id}", get(get_content))
        .route("/v1/chat/completions", post(chat_completions));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (
        format!("http://{}/wiki", addr),
        format!("http://{}/v1/chat/completions", addr),
    )
}

fn setup_test_env(base_url: &str, endpoint: &str, space_key: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[confluence]
base_url = "{}"
space_key = "{}"
page_limit = 50
timeout_secs = 10

[llm]
endpoint = "{}"
timeout_secs = 10
"#,
        base_url, space_key, endpoint
    );

    let config_path = config_dir.join("cqa.toml");
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

fn cqa_command(config_path: &Path, args: &[&str], with_credentials: bool) -> Command {
    let mut cmd = Command::new(cqa_binary());
    cmd.arg("--config")
        .arg(config_path)
        .arg("--progress")
        .arg("off")
        .args(args)
        .current_dir(config_path.parent().unwrap())
        .env_remove("CONFLUENCE_BASE_URL")
        .env_remove("CONFLUENCE_SPACE_KEY")
        .env_remove("RUST_LOG");
    if with_credentials {
        cmd.env("CONFLUENCE_EMAIL", "bot@acme.io")
            .env("CONFLUENCE_API_TOKEN", "confluence-token")
            .env("TOGETHER_API_KEY", "together-key");
    } else {
        cmd.env_remove("CONFLUENCE_EMAIL")
            .env_remove("CONFLUENCE_API_TOKEN")
            .env_remove("TOGETHER_API_KEY");
    }
    cmd
}

/// Run the binary off the runtime so the mock services keep serving.
async fn run_cqa(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run_cqa_with_stdin(config_path, args, None, true).await
}

async fn run_cqa_with_stdin(
    config_path: &Path,
    args: &[&str],
    stdin: Option<&str>,
    with_credentials: bool,
) -> (String, String, bool) {
    let mut cmd = cqa_command(config_path, args, with_credentials);
    let stdin = stdin.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = cmd
            .spawn()
            .unwrap_or_else(|e| panic!("Failed to run cqa binary at {:?}: {}", cqa_binary(), e));
        {
            let mut pipe = child.stdin.take().unwrap();
            if let Some(input) = stdin {
                pipe.write_all(input.as_bytes()).unwrap();
            }
        }
        let output = child.wait_with_output().unwrap();
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.success(),
        )
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_prints_document() {
    let (wiki, chat) = start_mocks().await;
    let (_tmp, config_path) = setup_test_env(&wiki, &chat, "ENG");

    let (stdout, stderr, success) = run_cqa(&config_path, &["fetch"]).await;
    assert!(success, "fetch failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("## Onboarding\nAsk for a laptop.\nBadge\nVPN"));
    assert!(stdout.contains("## Deploys\nWe deploy on Tuesdays."));
    assert!(stdout.find("## Onboarding").unwrap() < stdout.find("## Deploys").unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_writes_output_file() {
    let (wiki, chat) = start_mocks().await;
    let (tmp, config_path) = setup_test_env(&wiki, &chat, "ENG");
    let out = tmp.path().join("space.md");

    let (stdout, stderr, success) =
        run_cqa(&config_path, &["fetch", "--output", out.to_str().unwrap()]).await;
    assert!(success, "fetch failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Wrote"));

    let written = fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("\n\n## Onboarding\n"));
    assert!(written.contains("\n\n\n## Deploys\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_preview_truncates() {
    let (wiki, chat) = start_mocks().await;
    let (_tmp, config_path) = setup_test_env(&wiki, &chat, "ENG");

    let (stdout, _, success) = run_cqa(&config_path, &["fetch", "--preview", "15"]).await;
    assert!(success);
    assert!(stdout.contains("## Onboarding"));
    assert!(!stdout.contains("Deploys"));
    assert!(stdout.trim_end().ends_with("---"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_single_page() {
    let (wiki, chat) = start_mocks().await;
    let (_tmp, config_path) = setup_test_env(&wiki, &chat, "ENG");

    let (stdout, _, success) = run_cqa(&config_path, &["fetch", "--page", "42"]).await;
    assert!(success);
    assert!(stdout.contains("## Single\nJust this page."));
    assert!(!stdout.contains("Onboarding"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_failure_exits_nonzero() {
    let (wiki, chat) = start_mocks().await;
    let (_tmp, config_path) = setup_test_env(&wiki, &chat, "BROKEN");

    let (stdout, stderr, success) = run_cqa(&config_path, &["fetch"]).await;
    assert!(!success, "fetch should fail: stdout={}", stdout);
    assert!(stderr.contains("Failed to fetch pages of space BROKEN"), "stderr={}", stderr);
    assert!(stdout.is_empty(), "no partial document: {}", stdout);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_without_credentials_fails() {
    let (wiki, chat) = start_mocks().await;
    let (_tmp, config_path) = setup_test_env(&wiki, &chat, "ENG");

    let (_, stderr, success) = run_cqa_with_stdin(&config_path, &["fetch"], None, false).await;
    assert!(!success);
    assert!(stderr.contains("CONFLUENCE_EMAIL"), "stderr={}", stderr);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_prints_trimmed_answer() {
    let (wiki, chat) = start_mocks().await;
    let (_tmp, config_path) = setup_test_env(&wiki, &chat, "ENG");

    let (stdout, stderr, success) = run_cqa(&config_path, &["ask", "When do we deploy?"]).await;
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(
        stdout,
        "You asked 'When do we deploy?'. Deploys happen on Tuesdays.\n"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_loop_over_stdin() {
    let (wiki, chat) = start_mocks().await;
    let (_tmp, config_path) = setup_test_env(&wiki, &chat, "ENG");

    let (stdout, stderr, success) = run_cqa_with_stdin(
        &config_path,
        &["chat"],
        Some("When do we deploy?\n\nhistory\nexit\n"),
        true,
    )
    .await;
    assert!(success, "chat failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Start chatting with mistralai/Mixtral-8x7B-Instruct-v0.1!"));
    assert!(stdout.contains("AI: You asked 'When do we deploy?'. Deploys happen on Tuesdays."));
    assert!(stdout.contains("Please enter a question first."));
    assert!(stdout.contains("Q1: When do we deploy?"));
    assert!(stderr.contains("Loading Confluence content"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sources_reports_missing_credentials() {
    let (wiki, chat) = start_mocks().await;
    let (_tmp, config_path) = setup_test_env(&wiki, &chat, "ENG");

    let (stdout, _, success) =
        run_cqa_with_stdin(&config_path, &["sources"], None, false).await;
    assert!(success);
    assert!(stdout.contains("SERVICE"));
    assert!(stdout.contains("missing CONFLUENCE_EMAIL, CONFLUENCE_API_TOKEN"));
    assert!(stdout.contains("missing TOGETHER_API_KEY"));

    let (stdout, _, success) = run_cqa(&config_path, &["sources"]).await;
    assert!(success);
    assert!(stdout.contains("space ENG at"));
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("cqa.toml");
    fs::write(&config_path, "[llm]\nmax_tokens = 0\n").unwrap();

    let output = cqa_command(&config_path, &["sources"], false).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_tokens"));
}
