mod common;

use std::time::{Duration, Instant};

use common::{init_logging, ScriptedClient};
use futures_util::StreamExt;
use learnpath_core::JobKind;
use learnpath_engine::{
    poll, AsyncJob, ClientError, JobStatus, PollOutcome, PollSettings, PollUpdate,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn tts_job() -> AsyncJob {
    AsyncJob::new("job-1", JobKind::Tts)
}

fn in_flight(attempt: u32, status: JobStatus) -> PollUpdate {
    PollUpdate::InFlight { attempt, status }
}

async fn collect(client: &ScriptedClient, settings: PollSettings) -> Vec<PollUpdate> {
    poll(client, tts_job(), settings, CancellationToken::new())
        .collect()
        .await
}

#[tokio::test]
async fn reports_each_in_flight_status_then_the_terminal_one() {
    init_logging();
    let payload = json!({"status": "completed", "audioUrl": "x.mp3"});
    let client = ScriptedClient::new("job-1")
        .then_status(JobStatus::pending())
        .then_status(JobStatus::processing())
        .then_status(JobStatus::pending())
        .then_status(JobStatus::completed(payload.clone()));

    let updates = collect(&client, PollSettings::new(5, 20)).await;

    assert_eq!(
        updates,
        vec![
            in_flight(1, JobStatus::pending()),
            in_flight(2, JobStatus::processing()),
            in_flight(3, JobStatus::pending()),
            PollUpdate::Finished(PollOutcome::Completed {
                attempts: 4,
                payload,
            }),
        ]
    );
    assert_eq!(client.queries(), 4);
}

#[tokio::test]
async fn gives_up_after_exactly_max_attempts_queries() {
    init_logging();
    let client = ScriptedClient::new("job-1").forever(JobStatus::processing());

    let updates = collect(&client, PollSettings::new(5, 3)).await;

    assert_eq!(updates.len(), 3);
    assert_eq!(
        updates.last(),
        Some(&PollUpdate::Finished(PollOutcome::TimedOut { attempts: 3 }))
    );
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(client.queries(), 3);
}

#[tokio::test]
async fn zero_attempt_budget_times_out_without_querying() {
    let client = ScriptedClient::new("job-1").forever(JobStatus::pending());

    let updates = collect(&client, PollSettings::new(5, 0)).await;

    assert_eq!(
        updates,
        vec![PollUpdate::Finished(PollOutcome::TimedOut { attempts: 0 })]
    );
    assert_eq!(client.queries(), 0);
}

#[tokio::test]
async fn failed_job_is_terminal_with_its_reason() {
    let client = ScriptedClient::new("job-1")
        .then_status(JobStatus::processing())
        .then_status(JobStatus::failed(Some("quota exceeded".into())))
        .forever(JobStatus::processing());

    let updates = collect(&client, PollSettings::new(5, 10)).await;

    assert_eq!(
        updates.last(),
        Some(&PollUpdate::Finished(PollOutcome::Failed {
            attempts: 2,
            reason: Some("quota exceeded".into()),
        }))
    );
    assert_eq!(client.queries(), 2);
}

#[tokio::test]
async fn transport_error_ends_the_session() {
    let client = ScriptedClient::new("job-1")
        .then_status(JobStatus::pending())
        .then_error(ClientError::Timeout)
        .forever(JobStatus::pending());

    let updates = collect(&client, PollSettings::new(5, 10)).await;

    assert_eq!(
        updates.last(),
        Some(&PollUpdate::Finished(PollOutcome::QueryFailed {
            attempts: 2,
            error: ClientError::Timeout,
        }))
    );
    assert_eq!(client.queries(), 2);
}

#[tokio::test]
async fn first_query_does_not_wait_for_the_interval() {
    let client = ScriptedClient::new("job-1").then_status(JobStatus::completed(json!({})));

    let started = Instant::now();
    let updates = collect(&client, PollSettings::new(10_000, 5)).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(updates.len(), 1);
}

#[tokio::test]
async fn repeated_terminal_status_is_reported_once() {
    let client = ScriptedClient::new("job-1")
        .forever(JobStatus::completed(json!({"audioUrl": "x.mp3"})));

    let updates = collect(&client, PollSettings::new(5, 10)).await;

    assert_eq!(updates.len(), 1);
    assert_eq!(client.queries(), 1);
}

#[tokio::test]
async fn cancelled_stream_stops_querying() {
    init_logging();
    let client = ScriptedClient::new("job-1").forever(JobStatus::processing());
    let cancel = CancellationToken::new();
    let mut updates = std::pin::pin!(poll(
        &client,
        tts_job(),
        PollSettings::new(5, 100),
        cancel.clone()
    ));

    let first = updates.next().await;
    assert!(matches!(first, Some(PollUpdate::InFlight { attempt: 1, .. })));
    cancel.cancel();

    assert_eq!(updates.next().await, None);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(client.queries(), 1);
}

#[tokio::test]
async fn cancellation_interrupts_the_wait_between_queries() {
    let client = ScriptedClient::new("job-1").forever(JobStatus::pending());
    let cancel = CancellationToken::new();
    let mut updates = std::pin::pin!(poll(
        &client,
        tts_job(),
        PollSettings::new(10_000, 100),
        cancel.clone()
    ));
    assert!(updates.next().await.is_some());

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    assert_eq!(updates.next().await, None);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(client.queries(), 1);
}
