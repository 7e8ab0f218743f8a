use std::sync::{Arc, Mutex};
use std::time::Duration;

use gemini_api::{
    response_text, Content, GeminiApiClient, GeminiApiConfig, GeminiApiError,
    GenerateContentRequest, Part,
};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Clone)]
enum ScriptedResponse {
    Json { status: u16, body: String },
    Stall,
}

#[derive(Debug, Clone)]
struct CapturedRequest {
    head: String,
    body: Value,
}

struct ScriptedServer {
    base_url: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let captured = Arc::new(Mutex::new(Vec::new()));

        let handle = tokio::spawn({
            let captured = Arc::clone(&captured);
            async move {
                for script in scripts {
                    let Ok((socket, _)) = listener.accept().await else {
                        break;
                    };
                    serve_one(socket, script, Arc::clone(&captured)).await;
                }
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            captured,
            handle,
        }
    }

    fn captured(&self) -> Vec<CapturedRequest> {
        self.captured.lock().expect("captured lock").clone()
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_one(
    mut socket: TcpStream,
    script: ScriptedResponse,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    captured.lock().expect("captured lock").push(request);

    match script {
        ScriptedResponse::Json { status, body } => {
            let response = format!(
                "HTTP/1.1 {status} Scripted\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
        ScriptedResponse::Stall => {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];

    let header_end = loop {
        let read = socket.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(position) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let read = socket.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }

    let body = serde_json::from_slice(&buffer[header_end..]).unwrap_or(Value::Null);
    Some(CapturedRequest { head, body })
}

fn respond(status: u16, body: Value) -> ScriptedResponse {
    ScriptedResponse::Json {
        status,
        body: body.to_string(),
    }
}

fn client_for(server: &ScriptedServer) -> GeminiApiClient {
    let config = GeminiApiConfig::new("test-key")
        .with_base_url(&server.base_url)
        .with_timeout(Duration::from_millis(500));
    GeminiApiClient::new(config).expect("client")
}

fn simple_request() -> GenerateContentRequest {
    GenerateContentRequest::new(vec![Content::new("user", vec![Part::text("hi")])])
        .with_system_instruction("sys")
}

#[tokio::test]
async fn generate_posts_payload_and_returns_answer_text() {
    let server = ScriptedServer::new(vec![respond(
        200,
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "hello back"}
                ]},
                "finishReason": "STOP"
            }]
        }),
    )])
    .await;

    let client = client_for(&server);
    let request = simple_request().with_thinking_budget(1024);
    let text = client
        .generate_text("gemini-2.5-pro", &request)
        .await
        .expect("generate should succeed");
    assert_eq!(text, "hello back");

    let captured = server.captured();
    assert_eq!(captured.len(), 1);
    let head = captured[0].head.to_ascii_lowercase();
    assert!(head.starts_with("post /v1beta/models/gemini-2.5-pro:generatecontent http/1.1"));
    assert!(head.contains("x-goog-api-key: test-key"));
    assert_eq!(
        captured[0].body["generationConfig"]["thinkingConfig"]["thinkingBudget"],
        1024
    );
    assert_eq!(captured[0].body["contents"][0]["parts"][0]["text"], "hi");
}

#[tokio::test]
async fn generate_surfaces_status_errors_without_retrying() {
    let server = ScriptedServer::new(vec![
        respond(
            503,
            json!({"error": {"code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE"}}),
        ),
        respond(200, json!({"candidates": []})),
    ])
    .await;

    let client = client_for(&server);
    let error = client
        .generate("gemini-2.5-flash", &simple_request())
        .await
        .expect_err("503 must fail");

    match error {
        GeminiApiError::Status(status, message) => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(message, "The model is overloaded. (UNAVAILABLE)");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(server.captured().len(), 1);
}

#[tokio::test]
async fn generate_reports_blocked_prompts() {
    let server = ScriptedServer::new(vec![respond(
        200,
        json!({"promptFeedback": {"blockReason": "SAFETY"}}),
    )])
    .await;

    let client = client_for(&server);
    let response = client
        .generate("gemini-2.5-flash", &simple_request())
        .await
        .expect("HTTP call succeeds");
    let error = response_text(&response).expect_err("blocked prompt has no text");
    assert!(matches!(error, GeminiApiError::Blocked { ref reason } if reason == "SAFETY"));
}

#[tokio::test]
async fn generate_times_out_as_request_error() {
    let server = ScriptedServer::new(vec![ScriptedResponse::Stall]).await;

    let client = client_for(&server);
    let error = client
        .generate("gemini-2.5-flash", &simple_request())
        .await
        .expect_err("stalled server must time out");

    match error {
        GeminiApiError::Request(error) => assert!(error.is_timeout()),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn generate_rejects_missing_key_before_sending() {
    let server = ScriptedServer::new(vec![respond(200, json!({}))]).await;
    let config = GeminiApiConfig::new("").with_base_url(&server.base_url);
    let client = GeminiApiClient::new(config).expect("client");

    let error = client
        .generate("gemini-2.5-flash", &simple_request())
        .await
        .expect_err("missing key must fail");
    assert!(matches!(error, GeminiApiError::MissingApiKey));
    assert!(server.captured().is_empty());
}
