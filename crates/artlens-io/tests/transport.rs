//! Transport behavior against a throwaway local HTTP server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use artlens_core::ClientConfig;
use artlens_io::{ProgressFetch, Transport, TransportError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A canned response: status line tail and JSON body.
struct Canned {
    status: &'static str,
    body: &'static str,
}

const fn canned(status: &'static str, body: &'static str) -> Canned {
    Canned { status, body }
}

/// Serve `responses` in order, one per connection, and hand back the raw
/// requests once all have been answered.
async fn serve(responses: Vec<Canned>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for canned in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            requests.push(read_request(&mut socket).await);
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                canned.status,
                canned.body.len(),
                canned.body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
        requests
    });
    (format!("http://{addr}"), handle)
}

/// Read one request, headers and body.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
        if head.contains("transfer-encoding: chunked") {
            if buf.ends_with(b"0\r\n\r\n") {
                break;
            }
            continue;
        }
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= end + 4 + length {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn transport(base: &str) -> Transport {
    let config = ClientConfig {
        request_timeout_secs: 5,
        ..ClientConfig::with_base_url(base)
    };
    Transport::new(&config).unwrap()
}

#[tokio::test]
async fn upload_sends_file_field() {
    let (base, server) = serve(vec![canned("200 OK", r#"{"task_id": "abc-123"}"#)]).await;
    let response = transport(&base)
        .upload(b"\x89PNG fake".to_vec(), "art.png", "image/png")
        .await
        .unwrap();
    assert_eq!(response.task_id, "abc-123");

    let requests = server.await.unwrap();
    let request = requests[0].to_ascii_lowercase();
    assert!(request.starts_with("post /upload "));
    assert!(request.contains("multipart/form-data"));
    assert!(request.contains(r#"name="file""#));
    assert!(request.contains(r#"filename="art.png""#));
    assert!(request.contains("content-type: image/png"));
}

#[tokio::test]
async fn upload_failure_carries_status_text() {
    let (base, _server) = serve(vec![canned(
        "400 Bad Request",
        r#"{"detail": "File must be an image"}"#,
    )])
    .await;
    let err = transport(&base)
        .upload(b"text".to_vec(), "notes.png", "image/png")
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Upload(_)));
    assert_eq!(err.to_string(), "Upload failed: Bad Request");
}

#[tokio::test]
async fn upload_failure_uses_canonical_reason() {
    let (base, _server) = serve(vec![canned("400 Nope", "{}")]).await;
    let err = transport(&base)
        .upload(b"x".to_vec(), "a.png", "image/png")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Upload failed: Bad Request");
}

#[tokio::test]
async fn progress_found() {
    let (base, server) = serve(vec![canned(
        "200 OK",
        r#"{"progress": 40, "status": "Working", "steps": [], "partial_results": {}}"#,
    )])
    .await;
    let payload = transport(&base).get_progress("task-1").await.unwrap();
    assert_eq!(payload["progress"], 40);

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("GET /progress/task-1 "));
}

#[tokio::test]
async fn progress_not_found_is_absent() {
    let (base, _server) = serve(vec![
        canned("404 Not Found", r#"{"detail": "Task not found"}"#),
        canned("404 Not Found", r#"{"detail": "Task not found"}"#),
    ])
    .await;
    let transport = transport(&base);
    assert_eq!(transport.get_progress("missing").await, None);
    assert_eq!(
        transport.fetch_progress("missing").await,
        ProgressFetch::Absent { status: 404 }
    );
}

#[tokio::test]
async fn progress_network_failure_is_absent() {
    // Reserve a port, then close it so connections are refused.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = transport(&format!("http://{addr}"));
    assert_eq!(transport.get_progress("t").await, None);
    assert!(matches!(
        transport.fetch_progress("t").await,
        ProgressFetch::Unreachable(_)
    ));
}

#[tokio::test]
async fn progress_undecodable_body_is_absent() {
    let (base, _server) = serve(vec![canned("200 OK", "not json")]).await;
    assert!(matches!(
        transport(&base).fetch_progress("t").await,
        ProgressFetch::Unreachable(_)
    ));
}

#[tokio::test]
async fn stats_decoded() {
    let (base, _server) = serve(vec![
        canned(
            "200 OK",
            r#"{"avg_width": 800.5, "avg_height": 600.0, "avg_color": [120.0, 110.0, 100.0], "total_images": 3}"#,
        ),
        canned("200 OK", r#"{"total_images": 0}"#),
    ])
    .await;
    let transport = transport(&base);

    let stats = transport.get_stats().await.unwrap();
    assert_eq!(stats.total_images, 3);
    assert!((stats.avg_width - 800.5).abs() < f64::EPSILON);
    assert!((stats.avg_color[2] - 100.0).abs() < f64::EPSILON);

    let empty = transport.get_stats().await.unwrap();
    assert_eq!(empty.total_images, 0);
    assert!(empty.avg_height.abs() < f64::EPSILON);
}

#[tokio::test]
async fn stats_failure_carries_status_text() {
    let (base, _server) = serve(vec![canned("503 Service Unavailable", "{}")]).await;
    let err = transport(&base).get_stats().await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to fetch stats: Service Unavailable");
}

#[tokio::test]
async fn models_readiness() {
    let (base, _server) = serve(vec![
        canned("200 OK", r#"{"status": "loading"}"#),
        canned("200 OK", r#"{"status": "ready"}"#),
    ])
    .await;
    let transport = transport(&base);
    assert!(!transport.models_ready().await.unwrap());
    assert!(transport.models_ready().await.unwrap());
}
