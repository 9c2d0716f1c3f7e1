mod support;

use futures_util::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn sse_stream_opens_with_current_frame() {
    let server = support::TestServer::spawn().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/board-stream", server.base_url()))
        .send()
        .await
        .expect("board-stream request");
    assert!(response.status().is_success());
    assert!(
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("text/event-stream"))
            .unwrap_or(false)
    );

    let mut stream = response.bytes_stream();
    let mut collected = String::new();
    for _ in 0..5 {
        let chunk = timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("sse read timeout")
            .expect("sse chunk missing")
            .expect("sse chunk error");
        collected.push_str(&String::from_utf8_lossy(&chunk));
        if collected.contains("stream-open") && collected.contains("loading") {
            break;
        }
    }
    assert!(collected.contains("stream-open"));
    // The latest frame replays immediately after the open comment.
    assert!(collected.contains("\"view\":\"loading\""));
}
