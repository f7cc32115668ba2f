use std::collections::HashMap;
use std::io;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use learnpath_core::{JobRequest, OpId};
use tokio_util::sync::CancellationToken;

use crate::client::{JobClient, ReqwestJobClient};
use crate::config::{EngineConfig, PollConfig};
use crate::operation::{run_operation, UpdateSink};
use crate::{ClientError, EngineEvent, OperationUpdate};

enum EngineCommand {
    Start { op_id: OpId, request: JobRequest },
    Cancel { op_id: OpId },
    CancelAll,
}

type ActiveOperations = Arc<Mutex<HashMap<OpId, CancellationToken>>>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("could not start async runtime: {0}")]
    Runtime(#[from] io::Error),
}

/// Runs operations on a background tokio runtime.
///
/// Commands and events travel over std channels so the owner never needs an
/// async context. Dropping the handle cancels every running operation.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let client = ReqwestJobClient::new(&config.client)?;
        Ok(Self::with_client(Arc::new(client), config.polling)?)
    }

    pub fn with_client(client: Arc<dyn JobClient>, polling: PollConfig) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("learnpath-engine")
            .build()?;

        thread::Builder::new()
            .name("learnpath-engine-commands".to_string())
            .spawn(move || {
                let active: ActiveOperations = Arc::default();
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        EngineCommand::Start { op_id, request } => {
                            let cancel = CancellationToken::new();
                            lock(&active).insert(op_id, cancel.clone());
                            let client = client.clone();
                            let active = active.clone();
                            let sink = ChannelUpdateSink {
                                op_id,
                                tx: event_tx.clone(),
                                cancel: cancel.clone(),
                            };
                            runtime.spawn(async move {
                                run_operation(client.as_ref(), request, polling, cancel, &sink)
                                    .await;
                                lock(&active).remove(&op_id);
                            });
                        }
                        EngineCommand::Cancel { op_id } => {
                            if let Some(cancel) = lock(&active).remove(&op_id) {
                                engine_debug!("Cancelling operation {}", op_id);
                                cancel.cancel();
                            }
                        }
                        EngineCommand::CancelAll => cancel_all(&active),
                    }
                }
                cancel_all(&active);
                engine_info!("Engine stopped");
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn start(&self, op_id: OpId, request: JobRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Start { op_id, request });
    }

    pub fn cancel(&self, op_id: OpId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { op_id });
    }

    pub fn cancel_all(&self) {
        let _ = self.cmd_tx.send(EngineCommand::CancelAll);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

struct ChannelUpdateSink {
    op_id: OpId,
    tx: mpsc::Sender<EngineEvent>,
    cancel: CancellationToken,
}

impl UpdateSink for ChannelUpdateSink {
    fn emit(&self, update: OperationUpdate) {
        if self.cancel.is_cancelled() {
            return;
        }
        let _ = self.tx.send(EngineEvent {
            op_id: self.op_id,
            update,
        });
    }
}

fn lock(active: &ActiveOperations) -> std::sync::MutexGuard<'_, HashMap<OpId, CancellationToken>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}

fn cancel_all(active: &ActiveOperations) {
    for (_, cancel) in lock(active).drain() {
        cancel.cancel();
    }
}
