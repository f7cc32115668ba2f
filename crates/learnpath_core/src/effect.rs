use crate::{JobRequest, OpId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start submission and polling for a new operation.
    Submit { op_id: OpId, request: JobRequest },
    /// Stop an in-flight operation; it must not report anything afterwards.
    Cancel { op_id: OpId },
}
