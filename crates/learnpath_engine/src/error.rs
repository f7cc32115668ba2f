use learnpath_core::{FailureKind, JobKind, OpFailure};
use thiserror::Error;

/// Transport or protocol failure of a single HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("server responded with status {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("could not decode response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("{kind} submission response did not include a job id")]
    MissingJobId { kind: JobKind },
}

impl SubmissionError {
    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::Client(ClientError::HttpStatus { message, .. })
                if !message.is_empty() =>
            {
                format!("Could not start generation: {message}")
            }
            SubmissionError::Client(ClientError::Timeout) => {
                "Could not start generation: the server did not answer in time.".to_string()
            }
            SubmissionError::Client(ClientError::Network(_)) => {
                "Could not start generation: check your connection.".to_string()
            }
            _ => "Could not start generation.".to_string(),
        }
    }
}

/// A completed job whose payload lacks a required field or has the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {kind} result: {detail}")]
pub struct MalformedResult {
    pub kind: JobKind,
    pub detail: String,
}

impl MalformedResult {
    pub fn new(kind: JobKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

pub const DEFAULT_FAILURE_REASON: &str = "generation failed";

/// Terminal failure of one operation. Never retried by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("submission failed: {0}")]
    Submission(#[from] SubmissionError),
    #[error("backend reported failure: {reason}")]
    BackendFailure { reason: String },
    #[error("job did not finish after {attempts} status checks")]
    Timeout { attempts: u32 },
    #[error(transparent)]
    MalformedResult(#[from] MalformedResult),
    #[error("status check failed: {0}")]
    StatusQuery(ClientError),
}

impl OperationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            OperationError::Submission(_) => FailureKind::Submission,
            OperationError::BackendFailure { .. } => FailureKind::BackendFailure,
            OperationError::Timeout { .. } => FailureKind::Timeout,
            OperationError::MalformedResult(_) => FailureKind::MalformedResult,
            OperationError::StatusQuery(_) => FailureKind::Network,
        }
    }

    /// Text suitable for the end user. Parse details are never included.
    pub fn user_message(&self) -> String {
        match self {
            OperationError::Submission(err) => err.user_message(),
            OperationError::BackendFailure { reason } => reason.clone(),
            OperationError::Timeout { .. } => "Still processing, try again later.".to_string(),
            OperationError::MalformedResult(_) => {
                "Received an unexpected response from the server.".to_string()
            }
            OperationError::StatusQuery(_) => {
                "Lost contact with the server while waiting for the result.".to_string()
            }
        }
    }

    pub fn failure(&self) -> OpFailure {
        OpFailure::new(self.kind(), self.user_message())
    }
}
