mod support;

use reqwest::Client;

#[tokio::test]
async fn http_endpoints_smoke() {
    let server = support::TestServer::spawn().await;
    let client = Client::new();

    let health = client
        .get(format!("{}/health", server.base_url()))
        .send()
        .await
        .expect("health request");
    assert!(health.status().is_success());
    let body = health.text().await.expect("health body");
    assert_eq!(body, "ok");

    // With the feed disabled the board sits in its initial loading view. The
    // session task publishes that first frame asynchronously, so poll until
    // it lands rather than racing it.
    let mut frame = serde_json::Value::Null;
    for _ in 0..50 {
        let board = client
            .get(format!("{}/api/board", server.base_url()))
            .send()
            .await
            .expect("board request");
        if board.status().is_success() {
            frame = board.json().await.expect("board json");
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert_eq!(frame["view"], "loading");
    assert_eq!(frame["source"], "current");

    // Archive files are absent in this environment; the catalog still lists
    // both seasons because a failed load degrades to an empty dataset.
    let sources = client
        .get(format!("{}/api/sources", server.base_url()))
        .send()
        .await
        .expect("sources request");
    assert!(sources.status().is_success());
    let catalog: serde_json::Value = sources.json().await.expect("sources json");
    let ids: Vec<&str> = catalog
        .as_array()
        .expect("sources array")
        .iter()
        .filter_map(|meta| meta["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["current", "v1", "v2"]);
}

#[tokio::test]
async fn switching_to_archive_shows_empty_content() {
    let server = support::TestServer::spawn().await;
    let client = Client::new();

    let switch = client
        .get(format!("{}/api/switch?source=v1", server.base_url()))
        .send()
        .await
        .expect("switch request");
    assert_eq!(switch.status().as_u16(), 204);

    // The switch is applied asynchronously by the session task.
    let mut frame = serde_json::Value::Null;
    for _ in 0..50 {
        let board = client
            .get(format!("{}/api/board", server.base_url()))
            .send()
            .await
            .expect("board request");
        if board.status().is_success() {
            frame = board.json().await.expect("board json");
            if frame["source"] == "v1" {
                break;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert_eq!(frame["source"], "v1");
    assert_eq!(frame["view"], "content");
    assert_eq!(frame["empty"], true);
    assert!(frame["connectivity"].is_null());
    assert!(frame["period"].is_object());
}
