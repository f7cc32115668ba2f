//! Learnpath core: pure operation state machine, domain records and view-model helpers.
mod cache;
mod domain;
mod effect;
mod msg;
mod state;
mod tool_result;
mod update;
mod view_model;

pub use cache::{AudioCache, DEFAULT_AUDIO_CACHE_CAPACITY};
pub use domain::{
    id_string, optional_id, DomainResult, GeneratedQuiz, JobKind, JobRequest, QuizInfo,
    QuizQuestion, Session, StudyModule, StudyPathRecord, TtsAudio, UserId,
};
pub use effect::Effect;
pub use msg::Msg;
pub use state::{AppState, FailureKind, OpFailure, OpId, OpKey, OperationState, OverlapPolicy};
pub use tool_result::{MoodLog, Preferences, TaskItem, ToolResult};
pub use update::{update, SUBMITTING_MESSAGE};
pub use view_model::{AppViewModel, OperationRow};
