use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{LIVE_SOURCE_ID, LIVE_SOURCE_LABEL};

/// One validated leaderboard row. `time` is `None` when the raw field was
/// absent or unparsable; a genuine zero survives as `Some(0.0)`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ScoreRecord {
    pub(crate) name: String,
    pub(crate) score: i64,
    pub(crate) time: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RankedEntry {
    pub(crate) rank: usize,
    pub(crate) rank_display: String,
    pub(crate) name: String,
    pub(crate) score: i64,
    pub(crate) time: Option<String>,
    pub(crate) top_tier: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ViewState {
    Loading,
    Content(Vec<RankedEntry>),
    Error(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ConnectivityState {
    Unknown,
    Connected,
    Reconnecting,
    Disconnected,
}

impl ConnectivityState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ConnectivityState::Unknown => "unknown",
            ConnectivityState::Connected => "connected",
            ConnectivityState::Reconnecting => "reconnecting",
            ConnectivityState::Disconnected => "disconnected",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum SourceId {
    Live,
    Archive(String),
}

impl SourceId {
    pub(crate) fn parse(raw: &str) -> SourceId {
        if raw == LIVE_SOURCE_ID {
            SourceId::Live
        } else {
            SourceId::Archive(raw.to_string())
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        match self {
            SourceId::Live => LIVE_SOURCE_ID,
            SourceId::Archive(id) => id,
        }
    }
}

/// Fixed metadata for a selectable source. Archived sources carry the date
/// range of their competition period; the live source carries none.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SourceMeta {
    pub(crate) id: String,
    pub(crate) label: String,
    pub(crate) period: Option<Period>,
    pub(crate) show_times: bool,
}

impl SourceMeta {
    pub(crate) fn live() -> Self {
        Self {
            id: LIVE_SOURCE_ID.to_string(),
            label: LIVE_SOURCE_LABEL.to_string(),
            period: None,
            show_times: true,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Period {
    pub(crate) start: String,
    pub(crate) end: String,
}

/// A pre-loaded, immutable archived dataset. Records are normalized once at
/// load time and never mutated afterwards.
#[derive(Clone, Debug)]
pub(crate) struct ArchiveDataset {
    pub(crate) meta: SourceMeta,
    pub(crate) records: Vec<ScoreRecord>,
}

/// What the renderer sees. Serialized as-is onto the SSE stream and the
/// `/api/board` endpoint; every error condition is a value here, never an
/// HTTP failure.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RenderFrame {
    pub(crate) view: &'static str,
    pub(crate) entries: Vec<RankedEntry>,
    pub(crate) empty: bool,
    pub(crate) error: Option<String>,
    pub(crate) connectivity: Option<&'static str>,
    pub(crate) source: String,
    pub(crate) source_label: String,
    pub(crate) period: Option<Period>,
    pub(crate) updated_at: Option<u64>,
    pub(crate) ts: u64,
}

/// Raw archive export file. The upstream export nests everything under a
/// `Leaderboard` member; its absence means an empty board, not an error.
#[derive(Deserialize, Default)]
pub(crate) struct RawDataset {
    #[serde(rename = "Leaderboard")]
    pub(crate) leaderboard: Option<Map<String, Value>>,
}
