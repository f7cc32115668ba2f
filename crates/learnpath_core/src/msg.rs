use crate::{DomainResult, JobRequest, OpFailure, OpId, OpKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User asked for a generation job (study path, quiz or audio).
    Trigger(JobRequest),
    /// User abandoned the operation for a key.
    Cancel(OpKey),
    /// User acknowledged a shown result or error.
    Dismiss(OpKey),
    /// The owning screen is being torn down.
    ScreenClosed,
    /// Engine progress for an operation.
    OpLoading { op_id: OpId, message: String },
    /// Engine success for an operation.
    OpSucceeded { op_id: OpId, result: DomainResult },
    /// Engine failure for an operation.
    OpFailed { op_id: OpId, failure: OpFailure },
    /// Fallback for placeholder wiring.
    NoOp,
}
