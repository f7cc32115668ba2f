use engine_logging::engine_debug;

use crate::state::InFlight;
use crate::{
    AppState, DomainResult, Effect, JobRequest, Msg, OpId, OpKey, OperationState, OverlapPolicy,
};

/// Loading message shown between the trigger and the engine's first report.
pub const SUBMITTING_MESSAGE: &str = "Submitting request…";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Trigger(request) => trigger(&mut state, request),
        Msg::Cancel(key) => cancel(&mut state, &key).into_iter().collect(),
        Msg::ScreenClosed => state
            .in_flight_keys()
            .iter()
            .filter_map(|key| cancel(&mut state, key))
            .collect(),
        Msg::Dismiss(key) => {
            if state.operation(&key).is_terminal() {
                state.set_state(&key, OperationState::Idle);
            }
            Vec::new()
        }
        Msg::OpLoading { op_id, message } => {
            if let Some(key) = current_key(&state, op_id) {
                state.set_state(&key, OperationState::Loading { message });
            }
            Vec::new()
        }
        Msg::OpSucceeded { op_id, result } => {
            if let Some(key) = current_key(&state, op_id) {
                let finished = state.slot_mut(&key).in_flight.take();
                if let (
                    Some(InFlight {
                        request: JobRequest::Tts { text, .. },
                        ..
                    }),
                    DomainResult::Audio(audio),
                ) = (finished, &result)
                {
                    state.audio_cache_mut().insert(text, audio.clone());
                }
                state.set_state(&key, OperationState::Success(result));
            }
            Vec::new()
        }
        Msg::OpFailed { op_id, failure } => {
            if let Some(key) = current_key(&state, op_id) {
                state.slot_mut(&key).in_flight = None;
                state.set_state(&key, OperationState::Error(failure));
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn trigger(state: &mut AppState, request: JobRequest) -> Vec<Effect> {
    let key = OpKey::for_request(&request);

    if let JobRequest::Tts { text, .. } = &request {
        if let Some(audio) = state.audio_cache().get(text).cloned() {
            // A cache hit never overlaps: any in-flight audio job for the key is superseded.
            let effects = cancel(state, &key).into_iter().collect();
            state.set_state(&key, OperationState::Success(DomainResult::Audio(audio)));
            return effects;
        }
    }

    let mut effects = Vec::with_capacity(2);
    if state.in_flight_op(&key).is_some() {
        match state.policy() {
            OverlapPolicy::Ignore => {
                engine_debug!("Ignoring trigger for {key}: operation already in flight");
                return effects;
            }
            OverlapPolicy::Supersede => effects.extend(cancel(state, &key)),
        }
    }

    let op_id = state.allocate_op_id();
    state.slot_mut(&key).in_flight = Some(InFlight {
        op_id,
        request: request.clone(),
    });
    state.set_state(
        &key,
        OperationState::Loading {
            message: SUBMITTING_MESSAGE.to_string(),
        },
    );
    effects.push(Effect::Submit { op_id, request });
    effects
}

fn cancel(state: &mut AppState, key: &OpKey) -> Option<Effect> {
    let in_flight = state.slot_mut(key).in_flight.take()?;
    state.set_state(key, OperationState::Idle);
    Some(Effect::Cancel {
        op_id: in_flight.op_id,
    })
}

/// Key whose current in-flight operation is `op_id`; stale ids resolve to `None`.
fn current_key(state: &AppState, op_id: OpId) -> Option<OpKey> {
    let key = state.slot_key_for_op(op_id);
    if key.is_none() {
        engine_debug!("Dropping report for stale operation {op_id}");
    }
    key
}
