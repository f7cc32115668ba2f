use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use futures_util::stream::{self, Stream};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::client::JobClient;
use crate::config::PollSettings;
use crate::{AsyncJob, ClientError, JobState, JobStatus};

/// One bounded polling run against a single job.
///
/// Invariant: `attempts_made <= max_attempts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSession {
    pub job: AsyncJob,
    pub interval: Duration,
    pub max_attempts: u32,
    pub attempts_made: u32,
}

impl PollSession {
    pub fn new(job: AsyncJob, settings: PollSettings) -> Self {
        Self {
            job,
            interval: settings.interval(),
            max_attempts: settings.max_attempts,
            attempts_made: 0,
        }
    }

    fn budget_exhausted(&self) -> bool {
        self.attempts_made >= self.max_attempts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed { attempts: u32, payload: Value },
    Failed {
        attempts: u32,
        reason: Option<String>,
    },
    TimedOut { attempts: u32 },
    QueryFailed { attempts: u32, error: ClientError },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollUpdate {
    /// The job is still pending or processing after `attempt` queries.
    InFlight { attempt: u32, status: JobStatus },
    /// Emitted exactly once, after which the stream ends.
    Finished(PollOutcome),
}

enum Step {
    Query(PollSession),
    Done,
}

/// Polls `job` until a terminal state, the attempt budget, or cancellation.
///
/// The first query is issued immediately; later queries follow `settings.interval`.
/// A cancelled stream ends without yielding anything further.
pub fn poll<'a>(
    client: &'a dyn JobClient,
    job: AsyncJob,
    settings: PollSettings,
    cancel: CancellationToken,
) -> impl Stream<Item = PollUpdate> + Send + 'a {
    let first = PollSession::new(job, settings);
    stream::unfold(Step::Query(first), move |step| {
        let cancel = cancel.clone();
        async move {
            let mut session = match step {
                Step::Query(session) => session,
                Step::Done => return None,
            };
            if cancel.is_cancelled() {
                return None;
            }
            if session.budget_exhausted() {
                return Some((
                    PollUpdate::Finished(PollOutcome::TimedOut {
                        attempts: session.attempts_made,
                    }),
                    Step::Done,
                ));
            }
            if session.attempts_made > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => return None,
                    _ = tokio::time::sleep(session.interval) => {}
                }
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => return None,
                result = client.query_status(&session.job) => result,
            };
            session.attempts_made += 1;
            let attempts = session.attempts_made;

            let status = match result {
                Ok(status) => status,
                Err(error) => {
                    engine_warn!(
                        "Status query {} for {} job {} failed: {}",
                        attempts,
                        session.job.kind,
                        session.job.job_id,
                        error
                    );
                    return Some((
                        PollUpdate::Finished(PollOutcome::QueryFailed { attempts, error }),
                        Step::Done,
                    ));
                }
            };

            let update = match status.state {
                JobState::Completed => PollUpdate::Finished(PollOutcome::Completed {
                    attempts,
                    payload: status.result_payload.unwrap_or(Value::Null),
                }),
                JobState::Failed => PollUpdate::Finished(PollOutcome::Failed {
                    attempts,
                    reason: status.error_message,
                }),
                JobState::Pending | JobState::Processing if session.budget_exhausted() => {
                    engine_warn!(
                        "{} job {} still {} after {} status checks",
                        session.job.kind,
                        session.job.job_id,
                        status.state,
                        attempts
                    );
                    PollUpdate::Finished(PollOutcome::TimedOut { attempts })
                }
                JobState::Pending | JobState::Processing => {
                    engine_debug!(
                        "{} job {} {} (attempt {}/{})",
                        session.job.kind,
                        session.job.job_id,
                        status.state,
                        attempts,
                        session.max_attempts
                    );
                    let update = PollUpdate::InFlight {
                        attempt: attempts,
                        status,
                    };
                    return Some((update, Step::Query(session)));
                }
            };
            Some((update, Step::Done))
        }
    })
}
