use serde_json::{Map, Value};

use crate::board::{normalize, rank};
use crate::constants::{BACKEND_ERROR_MESSAGE, LOAD_TIMEOUT_MESSAGE};
use crate::models::{
    ArchiveDataset, ConnectivityState, Period, RankedEntry, RenderFrame, ScoreRecord, SourceId,
    SourceMeta, ViewState,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TimerKind {
    LoadDeadline,
    ReconnectGrace,
}

/// Everything that can drive the reconciler. Snapshot and connectivity events
/// come from the feed adapter, timer events from the session's armed timers,
/// switch events from the HTTP surface.
#[derive(Clone, Debug)]
pub(crate) enum Event {
    Snapshot {
        records: Map<String, Value>,
        received_at: u64,
    },
    Connectivity(bool),
    TimerFired(TimerKind),
    SwitchSource(SourceId),
    SourceError(String),
    Shutdown,
}

/// Side effects a transition asks the session driver to perform. Arming a
/// timer always replaces any timer of the same kind, so at most one of each
/// is ever pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Effect {
    ArmTimer(TimerKind),
    CancelTimer(TimerKind),
    Render,
}

/// Merges asynchronous connectivity and data events into the single view the
/// renderer shows. Pure with respect to time: timers fire back in as events,
/// and timestamps arrive stamped on the events that carry them.
pub(crate) struct Reconciler {
    view: ViewState,
    connectivity: ConnectivityState,
    selected: SourceId,
    live: Vec<ScoreRecord>,
    live_updated_at: Option<u64>,
    archives: Vec<ArchiveDataset>,
    initial_loaded: bool,
}

impl Reconciler {
    pub(crate) fn new(archives: Vec<ArchiveDataset>) -> (Self, Vec<Effect>) {
        let reconciler = Self {
            view: ViewState::Loading,
            connectivity: ConnectivityState::Unknown,
            selected: SourceId::Live,
            live: Vec::new(),
            live_updated_at: None,
            archives,
            initial_loaded: false,
        };
        (
            reconciler,
            vec![Effect::ArmTimer(TimerKind::LoadDeadline), Effect::Render],
        )
    }

    pub(crate) fn apply(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Snapshot {
                records,
                received_at,
            } => self.on_snapshot(records, received_at),
            Event::Connectivity(connected) => self.on_connectivity(connected),
            Event::TimerFired(kind) => self.on_timer(kind),
            Event::SwitchSource(source) => self.on_switch(source),
            Event::SourceError(message) => self.on_source_error(message),
            // Teardown is the session driver's business.
            Event::Shutdown => Vec::new(),
        }
    }

    fn on_snapshot(&mut self, records: Map<String, Value>, received_at: u64) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.initial_loaded {
            self.initial_loaded = true;
            effects.push(Effect::CancelTimer(TimerKind::LoadDeadline));
        }
        self.live = normalize(&records);
        self.live_updated_at = Some(received_at);
        // A snapshot exits Error back to Content, never to Loading.
        self.view = ViewState::Content(self.ranked_selected());
        effects.push(Effect::Render);
        effects
    }

    fn on_connectivity(&mut self, connected: bool) -> Vec<Effect> {
        if connected {
            self.connectivity = ConnectivityState::Connected;
            return vec![Effect::CancelTimer(TimerKind::ReconnectGrace), Effect::Render];
        }
        if !self.initial_loaded {
            // Still handshaking; don't flash "disconnected" before first data.
            return Vec::new();
        }
        if matches!(
            self.connectivity,
            ConnectivityState::Reconnecting | ConnectivityState::Disconnected
        ) {
            // The outage is already known; a repeated loss report (the feed
            // emits one per failed reconnect attempt) must not restart the
            // grace window or resurrect a dead connection indicator.
            return Vec::new();
        }
        self.connectivity = ConnectivityState::Reconnecting;
        vec![
            Effect::CancelTimer(TimerKind::ReconnectGrace),
            Effect::ArmTimer(TimerKind::ReconnectGrace),
            Effect::Render,
        ]
    }

    fn on_timer(&mut self, kind: TimerKind) -> Vec<Effect> {
        match kind {
            TimerKind::LoadDeadline => {
                if self.initial_loaded || !matches!(self.view, ViewState::Loading) {
                    return Vec::new();
                }
                self.view = ViewState::Error(LOAD_TIMEOUT_MESSAGE.to_string());
                self.connectivity = ConnectivityState::Disconnected;
                vec![Effect::Render]
            }
            TimerKind::ReconnectGrace => {
                if self.connectivity != ConnectivityState::Reconnecting {
                    // Stale firing after a reconnect already won.
                    return Vec::new();
                }
                self.connectivity = ConnectivityState::Disconnected;
                vec![Effect::Render]
            }
        }
    }

    fn on_switch(&mut self, source: SourceId) -> Vec<Effect> {
        if !self.knows(&source) {
            return Vec::new();
        }
        self.selected = source;
        match &self.selected {
            SourceId::Archive(_) => {
                // Archives are pre-loaded; selecting one ends any wait for
                // live data.
                let loading = matches!(self.view, ViewState::Loading);
                self.view = ViewState::Content(self.ranked_selected());
                if loading {
                    return vec![Effect::CancelTimer(TimerKind::LoadDeadline), Effect::Render];
                }
            }
            SourceId::Live => {
                // Without any live data yet, stay in Loading/Error rather
                // than showing an empty board as fresh content.
                if self.initial_loaded || matches!(self.view, ViewState::Content(_)) {
                    self.view = ViewState::Content(self.ranked_selected());
                }
            }
        }
        vec![Effect::Render]
    }

    fn on_source_error(&mut self, _message: String) -> Vec<Effect> {
        self.view = ViewState::Error(BACKEND_ERROR_MESSAGE.to_string());
        self.connectivity = ConnectivityState::Disconnected;
        vec![
            Effect::CancelTimer(TimerKind::LoadDeadline),
            Effect::CancelTimer(TimerKind::ReconnectGrace),
            Effect::Render,
        ]
    }

    fn knows(&self, source: &SourceId) -> bool {
        match source {
            SourceId::Live => true,
            SourceId::Archive(id) => self.archives.iter().any(|archive| archive.meta.id == *id),
        }
    }

    fn selected_meta(&self) -> SourceMeta {
        match &self.selected {
            SourceId::Live => SourceMeta::live(),
            SourceId::Archive(id) => self
                .archives
                .iter()
                .find(|archive| archive.meta.id == *id)
                .map(|archive| archive.meta.clone())
                .unwrap_or_else(SourceMeta::live),
        }
    }

    fn ranked_selected(&self) -> Vec<RankedEntry> {
        let meta = self.selected_meta();
        let records = match &self.selected {
            SourceId::Live => &self.live,
            SourceId::Archive(id) => self
                .archives
                .iter()
                .find(|archive| archive.meta.id == *id)
                .map(|archive| &archive.records)
                .unwrap_or(&self.live),
        };
        rank(records, meta.show_times)
    }

    /// Catalog of selectable sources, live first.
    pub(crate) fn sources(&self) -> Vec<SourceMeta> {
        let mut sources = vec![SourceMeta::live()];
        sources.extend(self.archives.iter().map(|archive| archive.meta.clone()));
        sources
    }

    pub(crate) fn frame(&self, now: u64) -> RenderFrame {
        let meta = self.selected_meta();
        let (view, entries, error) = match &self.view {
            ViewState::Loading => ("loading", Vec::new(), None),
            ViewState::Content(entries) => ("content", entries.clone(), None),
            ViewState::Error(message) => ("error", Vec::new(), Some(message.clone())),
        };
        let empty = view == "content" && entries.is_empty();
        let live_selected = self.selected == SourceId::Live;
        let (period, updated_at): (Option<Period>, Option<u64>) = if live_selected {
            (None, self.live_updated_at)
        } else {
            (meta.period.clone(), None)
        };
        RenderFrame {
            view,
            entries,
            empty,
            error,
            // The indicator only means anything for the live feed.
            connectivity: live_selected.then(|| self.connectivity.as_str()),
            source: meta.id,
            source_label: meta.label,
            period,
            updated_at,
            ts: now,
        }
    }

    #[cfg(test)]
    pub(crate) fn view(&self) -> &ViewState {
        &self.view
    }

    #[cfg(test)]
    pub(crate) fn connectivity(&self) -> ConnectivityState {
        self.connectivity
    }

    #[cfg(test)]
    pub(crate) fn live_records(&self) -> &[ScoreRecord] {
        &self.live
    }
}
