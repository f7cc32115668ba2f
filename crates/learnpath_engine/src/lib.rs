//! Learnpath engine: job submission, status polling and result projection.
mod client;
mod config;
mod engine;
mod error;
mod operation;
mod poll;
mod project;
mod types;

pub use client::{JobClient, ReqwestJobClient};
pub use config::{ClientSettings, ConfigError, EngineConfig, PollConfig, PollSettings, Routes};
pub use engine::{EngineError, EngineHandle};
pub use error::{
    ClientError, MalformedResult, OperationError, SubmissionError, DEFAULT_FAILURE_REASON,
};
pub use operation::{generating_message, in_flight_message, run_operation, UpdateSink};
pub use poll::{poll, PollOutcome, PollSession, PollUpdate};
pub use project::{project, study_path_id};
pub use types::{AsyncJob, EngineEvent, JobState, JobStatus, OperationUpdate, UnknownJobState};
