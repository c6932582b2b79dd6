//! HTTP tests for the completion client and the GitHub source
//!
//! Each test starts a small HTTP/1.1 server on localhost that answers from a
//! handler closure and records every request it received.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docsqueeze::config::GithubConfig;
use docsqueeze::llm::{CompletionRequest, LlmClient, LlmError, Message, Model, OpenAIClient, RetryPolicy};
use docsqueeze::source::GithubLocation;
use docsqueeze::{ChunkMode, Dispatcher, DocumentSource, Error, FileSink, GithubSource, Pipeline, Rewriter};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// =============================================================================
// Fake server
// =============================================================================

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    target: String,
    headers: HashMap<String, String>,
    body: String,
}

struct Reply {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: String,
}

impl Reply {
    fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![("content-type", "application/json".to_string())],
            body: body.into(),
        }
    }

    fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

type Handler = Arc<dyn Fn(&Recorded) -> Reply + Send + Sync>;

struct FakeServer {
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeServer {
    async fn start(handler: impl Fn(&Recorded) -> Reply + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let handler = handler.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    if let Some(request) = read_request(&mut stream).await {
                        let reply = handler(&request);
                        recorded.lock().unwrap().push(request);
                        write_reply(&mut stream, reply).await;
                    }
                });
            }
        });

        Self { base_url, requests }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    let length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < length {
        let n = stream.read(&mut tmp).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&tmp[..n]);
    }

    Some(Recorded {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

async fn write_reply(stream: &mut TcpStream, reply: Reply) {
    let mut response = format!("HTTP/1.1 {} Fake\r\n", reply.status);
    for (name, value) in &reply.headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str(&format!(
        "content-length: {}\r\nconnection: close\r\n\r\n{}",
        reply.body.len(),
        reply.body
    ));
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn completion_json(content: &str) -> String {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
    })
    .to_string()
}

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_backoff: Duration::from_millis(10),
    }
}

fn request(text: &str) -> CompletionRequest {
    CompletionRequest {
        model: Model::Gpt35Turbo.as_str().to_string(),
        system_prompt: "Reduce.".to_string(),
        messages: vec![Message::user(text)],
        max_tokens: 256,
        temperature: 0.0,
    }
}

// =============================================================================
// OpenAI client
// =============================================================================

#[tokio::test]
async fn test_openai_request_shape() {
    let server = FakeServer::start(|_| Reply::json(200, completion_json("- fact"))).await;
    let client = OpenAIClient::new("test-key", &server.base_url, Duration::from_secs(5), fast_retry(0)).unwrap();

    let response = client.complete(request("long text")).await.expect("complete should succeed");
    assert_eq!(response.content.as_deref(), Some("- fact"));
    assert_eq!(response.usage.input_tokens, 10);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].target, "/v1/chat/completions");
    assert_eq!(requests[0].headers.get("authorization").map(String::as_str), Some("Bearer test-key"));

    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body["model"], "gpt-3.5-turbo");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "Reduce.");
    assert_eq!(body["messages"][1]["content"], "long text");
    assert_eq!(body["temperature"], 0.0);
}

#[tokio::test]
async fn test_openai_retries_server_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let server = FakeServer::start(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Reply::json(503, r#"{"error":"overloaded"}"#)
        } else {
            Reply::json(200, completion_json("recovered"))
        }
    })
    .await;
    let client = OpenAIClient::new("k", &server.base_url, Duration::from_secs(5), fast_retry(3)).unwrap();

    let response = client.complete(request("text")).await.expect("retry should succeed");

    assert_eq!(response.content.as_deref(), Some("recovered"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_openai_honours_rate_limit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let server = FakeServer::start(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Reply::json(429, r#"{"error":"slow down"}"#).with_header("retry-after", "0")
        } else {
            Reply::json(200, completion_json("ok"))
        }
    })
    .await;
    let client = OpenAIClient::new("k", &server.base_url, Duration::from_secs(5), fast_retry(1)).unwrap();

    let response = client.complete(request("text")).await.expect("rate limit should be retried");
    assert_eq!(response.content.as_deref(), Some("ok"));
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_openai_client_error_not_retried() {
    let server = FakeServer::start(|_| Reply::json(400, r#"{"error":"bad model"}"#)).await;
    let client = OpenAIClient::new("k", &server.base_url, Duration::from_secs(5), fast_retry(3)).unwrap();

    let err = client.complete(request("text")).await.expect_err("400 should fail");

    assert!(matches!(err, LlmError::ApiError { status: 400, .. }));
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_openai_gives_up_after_max_retries() {
    let server = FakeServer::start(|_| Reply::json(500, "{}")).await;
    let client = OpenAIClient::new("k", &server.base_url, Duration::from_secs(5), fast_retry(2)).unwrap();

    let err = client.complete(request("text")).await.expect_err("should give up");

    assert!(matches!(err, LlmError::ApiError { status: 500, .. }));
    assert_eq!(server.requests().len(), 3);
}

// =============================================================================
// GitHub source
// =============================================================================

fn github_routes(request: &Recorded) -> Reply {
    let raw = request
        .headers
        .get("accept")
        .map(|a| a.contains("raw"))
        .unwrap_or(false);
    match (request.target.as_str(), raw) {
        ("/repos/o/r/contents/docs?ref=main", false) => Reply::json(
            200,
            r#"[
                {"name": "b-dir", "path": "docs/b-dir", "type": "dir"},
                {"name": "a.md", "path": "docs/a.md", "type": "file"},
                {"name": "logo.png", "path": "docs/logo.png", "type": "file"}
            ]"#,
        ),
        ("/repos/o/r/contents/docs/b-dir?ref=main", false) => Reply::json(
            200,
            r#"[
                {"name": "c.md", "path": "docs/b-dir/c.md", "type": "file"},
                {"name": "notes.txt", "path": "docs/b-dir/notes.txt", "type": "file"}
            ]"#,
        ),
        ("/repos/o/r/contents/docs/a.md?ref=main", true) => Reply::json(200, "# A\n\nalpha beta"),
        ("/repos/o/r/contents/docs/b-dir/c.md?ref=main", true) => Reply::json(200, "# C\n\ngamma"),
        _ => Reply::json(404, r#"{"message":"Not Found"}"#),
    }
}

fn github_source(server: &FakeServer, url: &str) -> GithubSource {
    GithubSource::new(
        GithubLocation::parse(url).unwrap(),
        &server.base_url,
        Some("ghp_test".to_string()),
        vec![".md".to_string()],
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_github_lists_depth_first() {
    let server = FakeServer::start(github_routes).await;
    let source = github_source(&server, "https://github.com/o/r/tree/main/docs");

    let ids = source.list().await.expect("list should succeed");

    assert_eq!(ids, vec!["docs/b-dir/c.md", "docs/a.md"]);
    let requests = server.requests();
    assert!(requests.iter().all(|r| r.headers.get("authorization").map(String::as_str) == Some("Bearer ghp_test")));
    assert!(requests.iter().all(|r| r.headers.contains_key("user-agent")));
}

#[tokio::test]
async fn test_github_fetches_raw_content() {
    let server = FakeServer::start(github_routes).await;
    let source = github_source(&server, "https://github.com/o/r/tree/main/docs");

    let doc = source.fetch("docs/a.md").await.expect("fetch should succeed");

    assert_eq!(doc.id(), "docs/a.md");
    assert_eq!(doc.text(), "# A\n\nalpha beta");
}

#[tokio::test]
async fn test_github_missing_path_is_source_not_found() {
    let server = FakeServer::start(github_routes).await;
    let source = github_source(&server, "https://github.com/o/r/tree/main/nope");

    let err = source.list().await.expect_err("missing path should fail");
    assert!(matches!(err, Error::SourceNotFound(_)));
}

#[tokio::test]
async fn test_github_token_from_config() {
    let server = FakeServer::start(github_routes).await;
    let config = GithubConfig {
        api_url: server.base_url.clone(),
        token_env: "DQ_HTTP_TEST_TOKEN_UNSET".to_string(),
        ..GithubConfig::default()
    };

    let source = GithubSource::from_config("https://github.com/o/r/tree/main/docs", &config).unwrap();
    source.list().await.expect("list should succeed");

    assert!(server.requests().iter().all(|r| !r.headers.contains_key("authorization")));
}

// =============================================================================
// End to end
// =============================================================================

#[tokio::test]
async fn test_github_to_file_end_to_end() {
    let github = FakeServer::start(github_routes).await;
    let openai = FakeServer::start(|request| {
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap_or_default();
        let user = body["messages"][1]["content"].as_str().unwrap_or("").trim().to_string();
        let heading = user.lines().next().unwrap_or("").to_string();
        Reply::json(200, completion_json(&format!("summary of {}", heading)))
    })
    .await;

    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("output.md");

    let llm = Arc::new(OpenAIClient::new("k", &openai.base_url, Duration::from_secs(5), fast_retry(0)).unwrap());
    let dispatcher = Dispatcher::new(Rewriter::new(llm, "Reduce.", Model::Gpt35Turbo), 600);
    let source = github_source(&github, "https://github.com/o/r/tree/main/docs");
    let pipeline = Pipeline::new(Box::new(source), dispatcher, ChunkMode::Auto);

    let mut sink = FileSink::new(&output);
    let summary = pipeline.run(&mut sink).await.expect("run should succeed");

    assert_eq!(summary.documents(), 2);
    assert!(summary.is_success());
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "summary of # C\nsummary of # A\n"
    );
    assert_eq!(openai.requests().len(), 2);
}
