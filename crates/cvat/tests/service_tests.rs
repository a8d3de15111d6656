//! CvatService against a minimal in-process HTTP server.

use std::collections::HashMap;
use std::net::SocketAddr;

use assert_matches::assert_matches;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use annolink_core::error::ServiceError;
use annolink_core::service::AnnotationService;
use annolink_cvat::{CvatApi, CvatConnection, CvatService, Timeouts};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Serve canned `(status, body)` responses keyed by request path. Unknown
/// paths answer 404. One request per connection.
async fn serve(routes: HashMap<&'static str, (u16, &'static str)>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            }
            let request = String::from_utf8_lossy(&buf);
            let path = request
                .split_whitespace()
                .nth(1)
                .unwrap_or("/")
                .split('?')
                .next()
                .unwrap_or("/")
                .to_string();
            let (status, body) = routes
                .get(path.as_str())
                .copied()
                .unwrap_or((404, r#"{"detail":"not found"}"#));
            let response = format!(
                "HTTP/1.1 {status} X\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    addr
}

fn service(addr: SocketAddr) -> CvatService {
    let connection = CvatConnection::new(format!("http://{addr}"), "user", "secret");
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    CvatService::new(CvatApi::with_client(client, connection, Timeouts::default()))
}

// ---------------------------------------------------------------------------
// Frame metadata
// ---------------------------------------------------------------------------

#[tokio::test]
async fn frame_metadata_failure_is_surfaced() {
    let addr = serve(HashMap::from([
        ("/api/tasks/1", (200, r#"{"id":1,"size":3}"#)),
        ("/api/tasks/1/data/meta", (500, "boom")),
    ]))
    .await;

    let result = service(addr).collection_frames(1).await;

    assert_matches!(result, Err(ServiceError::Remote { status: 500, .. }));
}

#[tokio::test]
async fn frame_names_come_from_metadata() {
    let addr = serve(HashMap::from([
        ("/api/tasks/1", (200, r#"{"id":1,"size":3}"#)),
        (
            "/api/tasks/1/data/meta",
            (200, r#"{"frames":[{"name":"a.jpg"},{"name":"b.jpg"}]}"#),
        ),
    ]))
    .await;

    let frames = service(addr).collection_frames(1).await.unwrap();

    let paths: Vec<&str> = frames.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["a.jpg", "b.jpg", "frame_2"]);
}

#[tokio::test]
async fn missing_task_is_not_found() {
    let addr = serve(HashMap::new()).await;

    let result = service(addr).collection_frames(7).await;

    assert_matches!(result, Err(ServiceError::NotFound { entity: "task", id: 7 }));
}
