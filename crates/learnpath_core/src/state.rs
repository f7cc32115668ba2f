use std::collections::BTreeMap;
use std::fmt;

use crate::cache::AudioCache;
use crate::view_model::{AppViewModel, OperationRow};
use crate::{DomainResult, JobKind, JobRequest, Session};

pub type OpId = u64;

/// Logical key under which at most one operation may be in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKey {
    StudyPath,
    Quiz { module_id: String },
    Tts { module_id: Option<String> },
}

impl OpKey {
    pub fn for_request(request: &JobRequest) -> Self {
        match request {
            JobRequest::StudyPath { .. } => OpKey::StudyPath,
            JobRequest::Quiz { module_id } => OpKey::Quiz {
                module_id: module_id.clone(),
            },
            JobRequest::Tts { module_id, .. } => OpKey::Tts {
                module_id: module_id.clone(),
            },
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            OpKey::StudyPath => JobKind::StudyPath,
            OpKey::Quiz { .. } => JobKind::Quiz,
            OpKey::Tts { .. } => JobKind::Tts,
        }
    }
}

impl fmt::Display for OpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKey::StudyPath => write!(f, "study path"),
            OpKey::Quiz { module_id } => write!(f, "quiz for module {module_id}"),
            OpKey::Tts {
                module_id: Some(module_id),
            } => write!(f, "audio for module {module_id}"),
            OpKey::Tts { module_id: None } => write!(f, "audio"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Submission,
    BackendFailure,
    Timeout,
    MalformedResult,
    Network,
}

/// User-facing description of a failed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl OpFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Observable state of one logical operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    Idle,
    Loading { message: String },
    Success(DomainResult),
    Error(OpFailure),
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationState::Success(_) | OperationState::Error(_))
    }
}

/// What a trigger does while the same key already has an operation in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    #[default]
    Ignore,
    Supersede,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InFlight {
    pub(crate) op_id: OpId,
    pub(crate) request: JobRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Slot {
    pub(crate) state: OperationState,
    pub(crate) in_flight: Option<InFlight>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    session: Session,
    policy: OverlapPolicy,
    next_op_id: OpId,
    slots: BTreeMap<OpKey, Slot>,
    audio_cache: AudioCache,
    dirty: bool,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            policy: OverlapPolicy::default(),
            next_op_id: 1,
            slots: BTreeMap::new(),
            audio_cache: AudioCache::default(),
            dirty: false,
        }
    }

    pub fn with_policy(mut self, policy: OverlapPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.audio_cache = AudioCache::with_capacity(capacity);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn operation(&self, key: &OpKey) -> &OperationState {
        const IDLE: &OperationState = &OperationState::Idle;
        self.slots.get(key).map_or(IDLE, |slot| &slot.state)
    }

    pub fn in_flight_op(&self, key: &OpKey) -> Option<OpId> {
        self.slots
            .get(key)
            .and_then(|slot| slot.in_flight.as_ref())
            .map(|in_flight| in_flight.op_id)
    }

    pub fn has_in_flight(&self) -> bool {
        self.slots.values().any(|slot| slot.in_flight.is_some())
    }

    pub fn audio_cache(&self) -> &AudioCache {
        &self.audio_cache
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            operations: self
                .slots
                .iter()
                .map(|(key, slot)| OperationRow {
                    key: key.clone(),
                    state: slot.state.clone(),
                    in_flight: slot.in_flight.is_some(),
                })
                .collect(),
            cached_audio: self.audio_cache.len(),
            dirty: self.dirty,
        }
    }

    /// Returns whether observable state changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn allocate_op_id(&mut self) -> OpId {
        let op_id = self.next_op_id;
        self.next_op_id += 1;
        op_id
    }

    pub(crate) fn slot_mut(&mut self, key: &OpKey) -> &mut Slot {
        self.slots.entry(key.clone()).or_default()
    }

    pub(crate) fn slot_key_for_op(&self, op_id: OpId) -> Option<OpKey> {
        self.slots.iter().find_map(|(key, slot)| {
            slot.in_flight
                .as_ref()
                .filter(|in_flight| in_flight.op_id == op_id)
                .map(|_| key.clone())
        })
    }

    pub(crate) fn in_flight_keys(&self) -> Vec<OpKey> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.in_flight.is_some())
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub(crate) fn audio_cache_mut(&mut self) -> &mut AudioCache {
        &mut self.audio_cache
    }

    /// Sets a slot's observable state, marking dirty only on a real change.
    pub(crate) fn set_state(&mut self, key: &OpKey, state: OperationState) {
        let slot = self.slot_mut(key);
        if slot.state != state {
            slot.state = state;
            self.dirty = true;
        }
    }
}
