use std::time::{Duration, Instant};

use engine_logging::{engine_debug, engine_info, engine_warn};
use learnpath_core::{update, AppState, AppViewModel, Effect, Msg};
use learnpath_engine::{EngineEvent, EngineHandle, OperationUpdate};

const EVENT_WAIT: Duration = Duration::from_millis(50);

/// Hands effects from the state machine to the engine.
pub(crate) struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub(crate) fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub(crate) fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Submit { op_id, request } => {
                    engine_info!("Submit op_id={} kind={}", op_id, request.kind());
                    self.engine.start(op_id, request);
                }
                Effect::Cancel { op_id } => {
                    engine_debug!("Cancel op_id={}", op_id);
                    self.engine.cancel(op_id);
                }
            }
        }
    }

    fn next_msg(&self, wait: Duration) -> Option<Msg> {
        self.engine.recv_timeout(wait).map(event_to_msg)
    }
}

pub(crate) fn event_to_msg(event: EngineEvent) -> Msg {
    let EngineEvent { op_id, update } = event;
    match update {
        OperationUpdate::Loading(message) => Msg::OpLoading { op_id, message },
        OperationUpdate::Succeeded(result) => Msg::OpSucceeded { op_id, result },
        OperationUpdate::Failed(err) => {
            engine_warn!("Operation {} failed: {}", op_id, err);
            Msg::OpFailed {
                op_id,
                failure: err.failure(),
            }
        }
    }
}

/// Owns the application state and feeds it messages one at a time.
pub(crate) struct Driver {
    state: Option<AppState>,
    runner: EffectRunner,
}

impl Driver {
    pub(crate) fn new(state: AppState, runner: EffectRunner) -> Self {
        Self {
            state: Some(state),
            runner,
        }
    }

    pub(crate) fn state(&self) -> Option<&AppState> {
        self.state.as_ref()
    }

    /// Applies `msg`, runs its effects and returns the view when it changed.
    pub(crate) fn dispatch(&mut self, msg: Msg) -> Option<AppViewModel> {
        let state = self.state.take()?;
        let (mut state, effects) = update(state, msg);
        let view = state.view();
        let changed = state.consume_dirty();
        self.state = Some(state);
        self.runner.enqueue(effects);
        changed.then_some(view)
    }

    /// Pumps engine events until nothing is in flight or `timeout` elapses.
    ///
    /// Returns `false` on timeout, leaving the operations running.
    pub(crate) fn run_until_settled(
        &mut self,
        timeout: Duration,
        mut on_view: impl FnMut(&AppViewModel),
    ) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if !self.state().is_some_and(AppState::has_in_flight) {
                return true;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return false;
            }
            if let Some(msg) = self.runner.next_msg(EVENT_WAIT) {
                if let Some(view) = self.dispatch(msg) {
                    on_view(&view);
                }
            }
        }
    }

    /// Cancels everything still running, as when the owning screen goes away.
    pub(crate) fn close(&mut self) {
        self.dispatch(Msg::ScreenClosed);
    }
}
