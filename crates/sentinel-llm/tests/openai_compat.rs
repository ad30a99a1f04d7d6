//! Drives OpenAiCompatBackend against a one-shot local HTTP server.

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use sentinel_core::{
    BackendError, ExtractionError, ModelBackend, Severity, StructuredExtractor,
};
use sentinel_llm::{BackendConfig, OpenAiCompatBackend};

struct Captured {
    head: String,
    body: Value,
}

/// Serve exactly one request with `status` and `body`, returning what was sent.
async fn serve_once(status: u16, body: String) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v1", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let (head_end, content_length) = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .map(|v| v.trim().parse::<usize>().unwrap())
                    .unwrap_or(0);
                break (pos + 4, len);
            }
        };
        while buf.len() < head_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        Captured {
            head: String::from_utf8_lossy(&buf[..head_end]).to_string(),
            body: serde_json::from_slice(&buf[head_end..head_end + content_length]).unwrap(),
        }
    });

    (base_url, handle)
}

fn completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}

#[tokio::test]
async fn extraction_through_http_backend() {
    let reply = "```json\n{\"severity\": \"Error\", \"category\": \"Dependency\", \"pattern_matched\": \"Failed to install\", \"suggested_action\": \"Check the package name\", \"learning_candidate\": \"yes\"}\n```";
    let (base_url, server) = serve_once(200, completion(reply)).await;

    let backend = OpenAiCompatBackend::with_resolved_key(
        BackendConfig::new(&base_url, "llama3"),
        Some("ollama".into()),
    )
    .unwrap();

    let result = StructuredExtractor::new()
        .extract("Error: Failed to install package", &backend)
        .await
        .unwrap();
    assert_eq!(result.severity, Severity::Error);
    assert_eq!(result.category, "Dependency");
    assert!(result.learning_candidate);

    let captured = server.await.unwrap();
    assert!(captured.head.starts_with("POST /v1/chat/completions"));
    assert!(captured
        .head
        .to_lowercase()
        .contains("authorization: bearer ollama"));
    assert_eq!(captured.body["model"], "llama3");
    assert!(captured.body["messages"][1]["content"]
        .as_str()
        .unwrap()
        .contains("Error: Failed to install package"));
}

#[tokio::test]
async fn http_error_status_is_backend_error() {
    let (base_url, server) = serve_once(429, json!({"error": "rate limited"}).to_string()).await;
    let backend =
        OpenAiCompatBackend::with_resolved_key(BackendConfig::new(&base_url, "gpt-4o"), None)
            .unwrap();

    let err = StructuredExtractor::new()
        .extract("Warning: Connection timeout", &backend)
        .await
        .unwrap_err();
    match err {
        ExtractionError::Backend {
            source: BackendError::Status { status, body },
            ..
        } => {
            assert_eq!(status, 429);
            assert!(body.contains("rate limited"));
        }
        other => panic!("unexpected error: {other}"),
    }
    let captured = server.await.unwrap();
    assert!(!captured.head.to_lowercase().contains("authorization"));
}

#[tokio::test]
async fn prose_reply_is_malformed() {
    let (base_url, server) = serve_once(200, completion("Sorry, I can't do that.")).await;
    let backend =
        OpenAiCompatBackend::with_resolved_key(BackendConfig::new(&base_url, "llama3"), None)
            .unwrap();

    let task = sentinel_core::log_analysis_task();
    let err = backend
        .invoke(&task, &sentinel_core::FieldMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::MalformedReply(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = OpenAiCompatBackend::with_resolved_key(
        BackendConfig::new(&format!("http://{addr}/v1"), "llama3"),
        None,
    )
    .unwrap();
    let err = backend
        .invoke(&sentinel_core::log_analysis_task(), &sentinel_core::FieldMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)));
}
