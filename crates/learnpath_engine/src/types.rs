use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use learnpath_core::{DomainResult, JobKind, OpId};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::OperationError;

/// A job accepted by the backend. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncJob {
    pub job_id: String,
    pub kind: JobKind,
    pub submitted_at: DateTime<Utc>,
}

impl AsyncJob {
    pub fn new(job_id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            job_id: job_id.into(),
            kind,
            submitted_at: Utc::now(),
        }
    }
}

/// Backend job status. Deserializes from the status string, ignoring case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job status {0:?}")]
pub struct UnknownJobState(pub String);

impl FromStr for JobState {
    type Err = UnknownJobState;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" => Ok(JobState::Pending),
            "processing" | "running" => Ok(JobState::Processing),
            "completed" => Ok(JobState::Completed),
            "failed" | "error" => Ok(JobState::Failed),
            _ => Err(UnknownJobState(raw.to_string())),
        }
    }
}

impl TryFrom<String> for JobState {
    type Error = UnknownJobState;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// One observation of a job's status.
///
/// `result_payload` is only present when completed, `error_message` only when failed.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub state: JobState,
    pub result_payload: Option<Value>,
    pub error_message: Option<String>,
}

impl JobStatus {
    pub fn pending() -> Self {
        Self::in_flight(JobState::Pending)
    }

    pub fn processing() -> Self {
        Self::in_flight(JobState::Processing)
    }

    fn in_flight(state: JobState) -> Self {
        Self {
            state,
            result_payload: None,
            error_message: None,
        }
    }

    pub fn completed(payload: Value) -> Self {
        Self {
            state: JobState::Completed,
            result_payload: Some(payload),
            error_message: None,
        }
    }

    pub fn failed(error_message: Option<String>) -> Self {
        Self {
            state: JobState::Failed,
            result_payload: None,
            error_message,
        }
    }
}

/// What an operation reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationUpdate {
    Loading(String),
    Succeeded(DomainResult),
    Failed(OperationError),
}

impl OperationUpdate {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationUpdate::Loading(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub op_id: OpId,
    pub update: OperationUpdate,
}
