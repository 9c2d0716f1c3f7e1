use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc, watch, RwLock};

use score_stream::render_index;

use crate::config::Config;
use crate::constants::BROADCAST_BUFFER;
use crate::models::{RenderFrame, SourceMeta};
use crate::reconcile::Event;
use crate::util::now_ms;

#[derive(Clone)]
pub(crate) enum StreamEvent {
    Frame(RenderFrame),
    Shutdown,
}

pub(crate) struct AppState {
    pub(crate) sender: broadcast::Sender<StreamEvent>,
    pub(crate) latest: Arc<RwLock<Option<RenderFrame>>>,
    pub(crate) events: mpsc::UnboundedSender<Event>,
    pub(crate) sources: Vec<SourceMeta>,
    pub(crate) initial_html: Arc<RwLock<Bytes>>,
    pub(crate) board_stream_url: String,
    pub(crate) cache_bust: String,
    pub(crate) config: Config,
    shutdown_tx: watch::Sender<bool>,
    shutdown_done: AtomicBool,
}

impl AppState {
    pub(crate) fn new(
        config: Config,
        events: mpsc::UnboundedSender<Event>,
        sources: Vec<SourceMeta>,
        board_stream_url: String,
    ) -> Arc<Self> {
        let (sender, _) = broadcast::channel(BROADCAST_BUFFER);
        let (shutdown_tx, _) = watch::channel(false);
        let cache_bust = now_ms().to_string();
        let base_html = render_index(&board_stream_url, &cache_bust, None);
        Arc::new(Self {
            sender,
            latest: Arc::new(RwLock::new(None)),
            events,
            sources,
            initial_html: Arc::new(RwLock::new(Bytes::from(base_html))),
            board_stream_url,
            cache_bust,
            config,
            shutdown_tx,
            shutdown_done: AtomicBool::new(false),
        })
    }

    pub(crate) fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Publishes a freshly reconciled frame: caches it for `/api/board`,
    /// bakes it into the index shell, and fans it out to SSE subscribers.
    pub(crate) async fn publish_frame(&self, frame: RenderFrame) {
        {
            let mut latest = self.latest.write().await;
            *latest = Some(frame.clone());
        }
        if let Some(json) = serialize_frame_for_html(&frame) {
            let html = render_index(&self.board_stream_url, &self.cache_bust, Some(&json));
            let mut cache = self.initial_html.write().await;
            *cache = Bytes::from(html);
        }
        let _ = self.sender.send(StreamEvent::Frame(frame));
    }

    /// Single teardown entry point: stops the feed, the session, and every
    /// SSE stream. Safe to call more than once.
    pub(crate) fn shutdown(&self) {
        if self.shutdown_done.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(true);
        let _ = self.events.send(Event::Shutdown);
        let _ = self.sender.send(StreamEvent::Shutdown);
    }
}

fn serialize_frame_for_html(frame: &RenderFrame) -> Option<String> {
    let json = serde_json::to_string(frame).ok()?;
    if json.contains("</") {
        Some(json.replace("</", "<\\/"))
    } else {
        Some(json)
    }
}
