use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum::http::HeaderValue;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{client::IntoClientRequest, Message};
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::{FEED_BASE_BACKOFF_MS, FEED_MAX_BACKOFF_MS};
use crate::reconcile::Event;
use crate::util::now_ms;

/// One message from the realtime backend. A snapshot replaces the whole
/// board; a missing `Leaderboard` member is an empty board. Acks echo our
/// subscribe id, and explicit errors surface as a data-source failure.
#[derive(Deserialize)]
struct FeedEnvelope {
    #[serde(rename = "Leaderboard")]
    leaderboard: Option<Map<String, Value>>,
    error: Option<FeedError>,
    id: Option<u64>,
    result: Option<Value>,
}

#[derive(Deserialize)]
struct FeedError {
    message: String,
}

enum FeedExit {
    Shutdown,
    Closed,
}

/// Maintains the upstream subscription for the lifetime of the process.
/// Transport-level retry lives here: the reconciler only ever sees the
/// connectivity boolean and the snapshots.
pub(crate) async fn run_feed(
    config: Config,
    events: mpsc::UnboundedSender<Event>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut backoff = Duration::from_millis(FEED_BASE_BACKOFF_MS);
    let max_backoff = Duration::from_millis(FEED_MAX_BACKOFF_MS);

    loop {
        match connect_and_stream(&config, &events, &mut shutdown).await {
            Ok(FeedExit::Shutdown) => {
                info!("feed subscription released");
                break;
            }
            Ok(FeedExit::Closed) => {
                warn!("feed connection closed; reconnecting");
                backoff = Duration::from_millis(FEED_BASE_BACKOFF_MS);
            }
            Err(err) => {
                warn!(?err, "feed connection failed; reconnecting");
            }
        }

        let _ = events.send(Event::Connectivity(false));

        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("feed subscription released before reconnect");
                    break;
                }
            }
        }
        backoff = std::cmp::min(backoff * 2, max_backoff);
    }
}

async fn connect_and_stream(
    config: &Config,
    events: &mpsc::UnboundedSender<Event>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<FeedExit> {
    let mut request = config
        .feed_url
        .clone()
        .into_client_request()
        .context("invalid feed URL")?;

    if let Some(token) = &config.feed_x_token {
        let header_value = HeaderValue::from_str(token).context("invalid feed token")?;
        request.headers_mut().insert("x-token", header_value);
    }

    let (ws_stream, _) = connect_async(request)
        .await
        .context("feed connect failed")?;
    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    let subscribe_request = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "subscribe",
        "params": { "path": config.feed_path },
    });

    ws_sink
        .send(Message::Text(subscribe_request.to_string()))
        .await
        .context("subscribe request failed")?;

    info!(path = %config.feed_path, "connected to leaderboard feed");
    let _ = events.send(Event::Connectivity(true));

    let mut ping_interval = tokio::time::interval(config.ws_ping_interval);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    // Drop the authenticated session cleanly on teardown.
                    let _ = ws_sink.send(Message::Close(None)).await;
                    return Ok(FeedExit::Shutdown);
                }
            }
            _ = ping_interval.tick() => {
                if let Err(err) = ws_sink.send(Message::Ping(Vec::new())).await {
                    return Err(anyhow!("failed to send ping: {}", err));
                }
            }
            message = ws_stream.next() => {
                let message = match message {
                    Some(message) => message,
                    None => return Ok(FeedExit::Closed),
                };
                let message = message.context("feed stream error")?;
                match message {
                    Message::Text(text) => {
                        let envelope: FeedEnvelope = match serde_json::from_str(&text) {
                            Ok(envelope) => envelope,
                            Err(err) => {
                                warn!(?err, "failed to parse feed message");
                                continue;
                            }
                        };

                        if let Some(error) = envelope.error {
                            warn!(message = %error.message, "feed reported backend error");
                            let _ = events.send(Event::SourceError(error.message));
                            continue;
                        }

                        if envelope.id.is_some() && envelope.result.is_some() {
                            info!("feed subscription confirmed");
                            continue;
                        }

                        let _ = events.send(Event::Snapshot {
                            records: envelope.leaderboard.unwrap_or_default(),
                            received_at: now_ms(),
                        });
                    }
                    Message::Ping(payload) => {
                        if let Err(err) = ws_sink.send(Message::Pong(payload)).await {
                            return Err(anyhow!("failed to respond to ping: {}", err));
                        }
                    }
                    Message::Close(frame) => {
                        warn!(?frame, "feed closed by upstream");
                        return Ok(FeedExit::Closed);
                    }
                    _ => {}
                }
            }
        }
    }
}
