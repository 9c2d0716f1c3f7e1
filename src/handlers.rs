use std::convert::Infallible;
use std::sync::Arc;

use async_stream::stream;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

use crate::models::SourceId;
use crate::reconcile::Event;
use crate::state::{AppState, StreamEvent};

#[derive(Deserialize)]
pub(crate) struct SwitchParams {
    source: Option<String>,
}

pub(crate) async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let html = state.initial_html.read().await.clone();
    let mut response = Response::new(Body::from(html));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

pub(crate) async fn board_handler(State(state): State<Arc<AppState>>) -> Response {
    {
        let latest = state.latest.read().await;
        if let Some(frame) = latest.as_ref() {
            return json_response(frame);
        }
    }
    error_response("board warming; try again shortly".to_string())
}

pub(crate) async fn sources_handler(State(state): State<Arc<AppState>>) -> Response {
    json_response(&state.sources)
}

/// Switching is an event into the session, not a render here; subscribers see
/// the resulting frame on the stream.
pub(crate) async fn switch_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SwitchParams>,
) -> Response {
    let raw = params
        .source
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let raw = match raw {
        Some(raw) => raw,
        None => return (StatusCode::BAD_REQUEST, cors_headers(), "missing source").into_response(),
    };

    let source = SourceId::parse(raw);
    if !state.sources.iter().any(|meta| meta.id == source.as_str()) {
        return (StatusCode::BAD_REQUEST, cors_headers(), "unknown source").into_response();
    }

    let _ = state.events.send(Event::SwitchSource(source));
    (StatusCode::NO_CONTENT, cors_headers()).into_response()
}

pub(crate) async fn options_handler() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, cors_headers())
}

pub(crate) async fn board_stream(State(state): State<Arc<AppState>>) -> Response {
    let stream_state = Arc::clone(&state);
    let heartbeat = state.config.heartbeat;

    let stream = stream! {
        let mut rx = stream_state.sender.subscribe();

        yield Ok::<_, Infallible>(SseEvent::default().comment("stream-open"));

        if let Some(frame) = stream_state.latest.read().await.clone() {
            if let Some(event) = frame_event(&frame) {
                yield Ok::<_, Infallible>(event);
            }
        }

        loop {
            match rx.recv().await {
                Ok(StreamEvent::Frame(frame)) => {
                    if let Some(event) = frame_event(&frame) {
                        yield Ok::<_, Infallible>(event);
                    }
                }
                Ok(StreamEvent::Shutdown) => break,
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    warn!("board-stream lagged; skipping frames");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    let sse = Sse::new(stream).keep_alive(KeepAlive::new().interval(heartbeat).text("heartbeat"));
    let mut response = sse.into_response();
    apply_stream_headers(&mut response);
    response
}

fn frame_event(frame: &crate::models::RenderFrame) -> Option<SseEvent> {
    match serde_json::to_string(frame) {
        Ok(json) => Some(SseEvent::default().data(json)),
        Err(err) => {
            warn!(?err, "failed to serialize frame");
            None
        }
    }
}

fn json_response<T: Serialize>(payload: &T) -> Response {
    let body = match serde_json::to_string(payload) {
        Ok(body) => body,
        Err(err) => return error_response(err.to_string()),
    };
    let mut headers = cors_headers();
    headers.insert("Content-Type", HeaderValue::from_static("application/json"));
    headers.insert(
        "Cache-Control",
        HeaderValue::from_static("no-cache, no-transform"),
    );
    (StatusCode::OK, headers, body).into_response()
}

fn error_response(message: String) -> Response {
    let headers = cors_headers();
    (StatusCode::INTERNAL_SERVER_ERROR, headers, message).into_response()
}

fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type"),
    );
    headers
}

fn apply_stream_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.extend(cors_headers());
    headers.insert(
        "Cache-Control",
        HeaderValue::from_static("no-cache, no-transform"),
    );
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));
    headers.insert("X-Accel-Buffering", HeaderValue::from_static("no"));
}
