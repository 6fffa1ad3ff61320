//! Shared fixtures: a tiny HTTP stub, a scripted LLM and corpus helpers.

use iamsage_core::config::{AppConfig, EmbeddingSettings};
use iamsage_core::AppResult;
use iamsage_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::path::Path;
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Canned HTTP response.
pub struct StubReply {
    status: u16,
    body: serde_json::Value,
}

impl StubReply {
    pub fn ok(body: serde_json::Value) -> Self {
        Self { status: 200, body }
    }

    pub fn status(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }
}

/// A request the stub received.
#[derive(Debug)]
pub struct RecordedRequest {
    pub path: String,
    pub body: serde_json::Value,
}

pub struct HttpStub {
    pub url: String,
    handle: JoinHandle<Vec<RecordedRequest>>,
}

impl HttpStub {
    /// Wait for the expected requests and return them in arrival order.
    pub async fn finish(self) -> Vec<RecordedRequest> {
        self.handle.await.unwrap()
    }
}

/// Serve `expected` JSON requests on a loopback port, one per connection.
pub async fn spawn_http_stub<F>(expected: usize, reply: F) -> HttpStub
where
    F: Fn(&serde_json::Value) -> StubReply + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for _ in 0..expected {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let answer = reply(&request.body);

            let payload = answer.body.to_string();
            let response = format!(
                "HTTP/1.1 {} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                answer.status,
                payload.len(),
                payload
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            requests.push(request);
        }
        requests
    });

    HttpStub { url, handle }
}

async fn read_request(socket: &mut TcpStream) -> RecordedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = serde_json::from_slice(&buf[body_start..body_start + content_length])
        .unwrap_or(serde_json::Value::Null);

    RecordedRequest { path, body }
}

/// LLM fake that answers with a closure and records every request.
pub struct ScriptedLlm<F> {
    reply: F,
    requests: Mutex<Vec<LlmRequest>>,
}

impl<F> ScriptedLlm<F>
where
    F: Fn(&LlmRequest) -> AppResult<String> + Send + Sync,
{
    pub fn new(reply: F) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl<F> LlmClient for ScriptedLlm<F>
where
    F: Fn(&LlmRequest) -> AppResult<String> + Send + Sync,
{
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let content = (self.reply)(request)?;
        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}

/// Pretends to be an IAM expert: echoes the context line that best overlaps the question.
pub fn echo_best_line(request: &LlmRequest) -> AppResult<String> {
    let (context, question) = request
        .prompt
        .split_once("QUESTION:")
        .unwrap_or((request.prompt.as_str(), ""));
    let question_words: Vec<String> = question
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(|w| w.to_lowercase())
        .collect();

    let best = context
        .split(['\n', '.'])
        .max_by_key(|line| {
            let lower = line.to_lowercase();
            question_words.iter().filter(|w| lower.contains(w.as_str())).count()
        })
        .unwrap_or_default();

    Ok(best.trim().to_string())
}

pub const LEAST_PRIVILEGE: &str = "The Principle of Least Privilege means a user is given the minimum access needed to do their job.";

/// A small IAM corpus.
pub fn write_corpus(raw_dir: &Path) {
    std::fs::create_dir_all(raw_dir).unwrap();
    std::fs::write(
        raw_dir.join("least-privilege.md"),
        format!(
            "# Least privilege\n\n{} Access beyond that is removed during reviews.\n",
            LEAST_PRIVILEGE
        ),
    )
    .unwrap();
    std::fs::write(
        raw_dir.join("mfa.md"),
        "# Multi-factor authentication\n\nMFA combines something you know with something you have. \
         Hardware keys resist phishing better than SMS codes.\n",
    )
    .unwrap();
    std::fs::write(
        raw_dir.join("sso.txt"),
        "Single sign-on lets one identity provider authenticate users for many applications. \
         SAML and OpenID Connect are common federation protocols.\n",
    )
    .unwrap();
    std::fs::write(raw_dir.join("notes.json"), "{\"ignored\": true}").unwrap();
}

/// Config rooted at `workspace` using the offline embedder.
pub fn test_config(workspace: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.workspace = workspace.to_path_buf();
    config.embedding = EmbeddingSettings {
        provider: "hash".to_string(),
        model: "trigram-v1".to_string(),
        dimensions: 256,
        ..EmbeddingSettings::default()
    };
    config.chunking.chunk_size = 120;
    config.chunking.chunk_overlap = 20;
    config.llm.provider = "ollama".to_string();
    config.llm.model = "test-model".to_string();
    config
}
