use std::env;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

use crate::constants::{
    DEFAULT_ARCHIVE_BASE, DEFAULT_FEED_PATH, DEFAULT_FEED_URL, DEFAULT_HEARTBEAT_MS,
    DEFAULT_LOAD_TIMEOUT_MS, DEFAULT_PORT, DEFAULT_RECONNECT_GRACE_MS, DEFAULT_WS_PING_MS,
};
use crate::models::Period;

#[derive(Clone)]
pub(crate) struct Config {
    pub(crate) feed_url: String,
    pub(crate) feed_x_token: Option<String>,
    pub(crate) feed_path: String,
    pub(crate) port: u16,
    pub(crate) load_timeout: Duration,
    pub(crate) reconnect_grace: Duration,
    pub(crate) heartbeat: Duration,
    pub(crate) ws_ping_interval: Duration,
    pub(crate) archive_base: String,
    pub(crate) archives: Vec<ArchiveSpec>,
}

/// Where an archived dataset lives and how it is presented. The location is
/// resolved against `archive_base`, which may be a directory or an http(s)
/// base URL.
#[derive(Clone)]
pub(crate) struct ArchiveSpec {
    pub(crate) id: &'static str,
    pub(crate) label: &'static str,
    pub(crate) file: &'static str,
    pub(crate) period: Period,
    pub(crate) show_times: bool,
}

fn default_archives() -> Vec<ArchiveSpec> {
    vec![
        ArchiveSpec {
            id: "v1",
            label: "Season 1",
            file: "leaderboard-v1-export.json",
            period: Period {
                start: "2025-12-16".to_string(),
                end: "2026-01-17".to_string(),
            },
            // The first season was scored without run times.
            show_times: false,
        },
        ArchiveSpec {
            id: "v2",
            label: "Season 2",
            file: "leaderboard-v2-export.json",
            period: Period {
                start: "2026-02-18".to_string(),
                end: "2026-02-18".to_string(),
            },
            show_times: true,
        },
    ]
}

impl Config {
    pub(crate) fn from_env() -> Result<Self> {
        let feed_override = read_env_first(&["FEED_URL", "FEED_WSS_URL"]);
        let using_default_feed = feed_override.is_none();
        let feed_url = feed_override
            .as_deref()
            .map(derive_ws_url)
            .unwrap_or_else(|| DEFAULT_FEED_URL.to_string());
        if using_default_feed {
            warn!("FEED_URL not set; defaulting to {}", DEFAULT_FEED_URL);
        }
        let feed_x_token = read_env_first(&["FEED_X_TOKEN"]);
        let feed_path =
            read_env_first(&["FEED_PATH"]).unwrap_or_else(|| DEFAULT_FEED_PATH.to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let load_timeout = Duration::from_millis(
            env::var("LOAD_TIMEOUT_MS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(DEFAULT_LOAD_TIMEOUT_MS),
        );

        let reconnect_grace = Duration::from_millis(
            env::var("RECONNECT_GRACE_MS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RECONNECT_GRACE_MS),
        );

        let heartbeat = Duration::from_millis(
            env::var("SSE_HEARTBEAT_MS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(DEFAULT_HEARTBEAT_MS),
        );

        let ws_ping_interval = Duration::from_millis(
            env::var("WS_PING_MS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(DEFAULT_WS_PING_MS),
        );

        let archive_base =
            env::var("ARCHIVE_BASE").unwrap_or_else(|_| DEFAULT_ARCHIVE_BASE.to_string());

        Ok(Self {
            feed_url,
            feed_x_token,
            feed_path,
            port,
            load_timeout,
            reconnect_grace,
            heartbeat,
            ws_ping_interval,
            archive_base,
            archives: default_archives(),
        })
    }
}

pub(crate) fn read_env_first(keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Ok(value) = env::var(key) {
            let trimmed = value.trim().to_string();
            if !trimmed.is_empty() {
                return Some(trimmed);
            }
        }
    }
    None
}

pub(crate) fn derive_ws_url(feed_url: &str) -> String {
    let mut url = match url::Url::parse(feed_url) {
        Ok(url) => url,
        Err(_) => return feed_url.to_string(),
    };
    match url.scheme() {
        "http" => {
            let _ = url.set_scheme("ws");
        }
        "https" => {
            let _ = url.set_scheme("wss");
        }
        "ws" | "wss" => {}
        _ => return feed_url.to_string(),
    }
    url.to_string()
}
