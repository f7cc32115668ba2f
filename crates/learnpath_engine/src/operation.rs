use engine_logging::{engine_debug, engine_error, engine_warn};
use futures_util::StreamExt;
use learnpath_core::{JobKind, JobRequest};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::client::{unwrap_envelope, JobClient};
use crate::config::PollConfig;
use crate::error::DEFAULT_FAILURE_REASON;
use crate::poll::{poll, PollOutcome, PollUpdate};
use crate::project::{project, study_path_id};
use crate::{AsyncJob, JobState, OperationError, OperationUpdate};

/// Receives the updates of one operation.
pub trait UpdateSink: Send + Sync {
    fn emit(&self, update: OperationUpdate);
}

pub fn generating_message(kind: JobKind) -> &'static str {
    match kind {
        JobKind::StudyPath => "Generating study path with AI…",
        JobKind::Quiz => "Generating quiz…",
        JobKind::Tts => "Synthesizing audio…",
    }
}

pub fn in_flight_message(kind: JobKind, state: JobState) -> &'static str {
    match state {
        JobState::Pending => "Waiting in queue…",
        _ => generating_message(kind),
    }
}

/// Submits `request`, polls it to a terminal state and projects the result.
///
/// Reports one `Loading` once the job is accepted, one per in-flight status
/// and exactly one terminal update. Once `cancel` fires nothing more is
/// reported and no further requests are made.
pub async fn run_operation(
    client: &dyn JobClient,
    request: JobRequest,
    polling: PollConfig,
    cancel: CancellationToken,
    sink: &dyn UpdateSink,
) {
    let kind = request.kind();
    let emit = |update: OperationUpdate| {
        if !cancel.is_cancelled() {
            sink.emit(update);
        }
    };
    if cancel.is_cancelled() {
        return;
    }

    let submitted = tokio::select! {
        _ = cancel.cancelled() => {
            engine_debug!("{} operation cancelled during submission", kind);
            return;
        }
        submitted = client.submit(&request) => submitted,
    };
    let job = match submitted {
        Ok(job) => job,
        Err(err) => {
            engine_warn!("Could not submit {} job: {}", kind, err);
            emit(OperationUpdate::Failed(err.into()));
            return;
        }
    };
    emit(OperationUpdate::Loading(generating_message(kind).to_string()));

    let session = poll(client, job.clone(), polling.for_kind(kind), cancel.clone());
    let mut updates = std::pin::pin!(session);
    while let Some(update) = updates.next().await {
        match update {
            PollUpdate::InFlight { status, .. } => {
                emit(OperationUpdate::Loading(in_flight_message(kind, status.state).to_string()));
            }
            PollUpdate::Finished(outcome) => {
                if let Some(terminal) = finish(client, &job, &request, outcome, &cancel).await {
                    emit(terminal);
                }
                return;
            }
        }
    }
    engine_debug!("{} job {} cancelled while polling", kind, job.job_id);
}

async fn finish(
    client: &dyn JobClient,
    job: &AsyncJob,
    request: &JobRequest,
    outcome: PollOutcome,
    cancel: &CancellationToken,
) -> Option<OperationUpdate> {
    let error = match outcome {
        PollOutcome::Completed { payload, .. } => {
            let payload = if let JobRequest::StudyPath { .. } = request {
                match with_modules(client, job, payload, cancel).await? {
                    Ok(payload) => payload,
                    Err(err) => return Some(OperationUpdate::Failed(err)),
                }
            } else {
                payload
            };
            match project(job, request, &payload) {
                Ok(result) => return Some(OperationUpdate::Succeeded(result)),
                Err(err) => {
                    engine_error!(
                        "{} job {}: {} (payload {})",
                        job.kind,
                        job.job_id,
                        err,
                        payload
                    );
                    OperationError::MalformedResult(err)
                }
            }
        }
        PollOutcome::Failed { reason, .. } => {
            let reason = reason.unwrap_or_else(|| DEFAULT_FAILURE_REASON.to_string());
            engine_warn!("{} job {} failed: {}", job.kind, job.job_id, reason);
            OperationError::BackendFailure { reason }
        }
        PollOutcome::TimedOut { attempts } => OperationError::Timeout { attempts },
        PollOutcome::QueryFailed { error, .. } => OperationError::StatusQuery(error),
    };
    Some(OperationUpdate::Failed(error))
}

/// Makes sure a completed study-path payload carries its module list,
/// fetching it when the status response does not embed it.
///
/// Returns `None` when cancelled.
async fn with_modules(
    client: &dyn JobClient,
    job: &AsyncJob,
    payload: Value,
    cancel: &CancellationToken,
) -> Option<Result<Value, OperationError>> {
    let mut payload = unwrap_envelope(payload);
    if payload.get("modules").is_some_and(Value::is_array) {
        return Some(Ok(payload));
    }
    let id = match study_path_id(&payload) {
        Ok(id) => id,
        Err(err) => {
            engine_error!(
                "{} job {}: {} (payload {})",
                job.kind,
                job.job_id,
                err,
                payload
            );
            return Some(Err(err.into()));
        }
    };

    let fetched = tokio::select! {
        _ = cancel.cancelled() => return None,
        fetched = client.fetch_study_path_modules(&id) => fetched,
    };
    match (fetched, payload.as_object_mut()) {
        (Ok(modules), Some(object)) => {
            object.insert("modules".to_string(), modules);
            Some(Ok(payload))
        }
        (Ok(_), None) => Some(Ok(payload)),
        (Err(err), _) => {
            engine_warn!("Could not fetch modules of study path {}: {}", id, err);
            Some(Err(OperationError::StatusQuery(err)))
        }
    }
}
