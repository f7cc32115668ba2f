use crate::{OpKey, OperationState};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub operations: Vec<OperationRow>,
    pub cached_audio: usize,
    pub dirty: bool,
}

impl AppViewModel {
    pub fn operation(&self, key: &OpKey) -> Option<&OperationRow> {
        self.operations.iter().find(|row| &row.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRow {
    pub key: OpKey,
    pub state: OperationState,
    pub in_flight: bool,
}
