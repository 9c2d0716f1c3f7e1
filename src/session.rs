use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::reconcile::{Effect, Event, Reconciler, TimerKind};
use crate::state::AppState;
use crate::util::now_ms;

/// Cancelable deferred firing of a single timer kind. Dropping or aborting
/// the task is the cancellation; the guarded event simply never arrives.
struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    fn arm(kind: TimerKind, delay: Duration, events: mpsc::UnboundedSender<Event>) -> Self {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Event::TimerFired(kind));
        });
        Self { task }
    }

    fn cancel(self) {
        self.task.abort();
    }
}

struct Timers {
    load_deadline: Option<TimerHandle>,
    reconnect_grace: Option<TimerHandle>,
}

impl Timers {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<TimerHandle> {
        match kind {
            TimerKind::LoadDeadline => &mut self.load_deadline,
            TimerKind::ReconnectGrace => &mut self.reconnect_grace,
        }
    }

    fn cancel(&mut self, kind: TimerKind) {
        if let Some(handle) = self.slot(kind).take() {
            handle.cancel();
        }
    }

    fn cancel_all(&mut self) {
        self.cancel(TimerKind::LoadDeadline);
        self.cancel(TimerKind::ReconnectGrace);
    }
}

/// Serializes every state transition onto one task: events in, effects out.
/// Arming a timer replaces any pending timer of the same kind, so a stale
/// grace timer can never race a fresh one.
pub(crate) async fn run_session(
    state: Arc<AppState>,
    mut rx: mpsc::UnboundedReceiver<Event>,
    mut reconciler: Reconciler,
    initial_effects: Vec<Effect>,
) {
    let mut timers = Timers {
        load_deadline: None,
        reconnect_grace: None,
    };

    run_effects(&state, &reconciler, &mut timers, initial_effects).await;

    while let Some(event) = rx.recv().await {
        if matches!(event, Event::Shutdown) {
            timers.cancel_all();
            info!("session shut down; timers released");
            break;
        }
        debug!(?event, "session event");
        let effects = reconciler.apply(event);
        run_effects(&state, &reconciler, &mut timers, effects).await;
    }
}

async fn run_effects(
    state: &Arc<AppState>,
    reconciler: &Reconciler,
    timers: &mut Timers,
    effects: Vec<Effect>,
) {
    for effect in effects {
        match effect {
            Effect::ArmTimer(kind) => {
                timers.cancel(kind);
                let delay = match kind {
                    TimerKind::LoadDeadline => state.config.load_timeout,
                    TimerKind::ReconnectGrace => state.config.reconnect_grace,
                };
                *timers.slot(kind) = Some(TimerHandle::arm(kind, delay, state.events.clone()));
            }
            Effect::CancelTimer(kind) => timers.cancel(kind),
            Effect::Render => state.publish_frame(reconciler.frame(now_ms())).await,
        }
    }
}
