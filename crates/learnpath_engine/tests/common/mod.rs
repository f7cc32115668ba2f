#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};

use learnpath_core::JobRequest;
use learnpath_engine::{
    AsyncJob, ClientError, JobClient, JobStatus, OperationUpdate, SubmissionError, UpdateSink,
};
use serde_json::Value;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// In-memory backend that replays scripted statuses and counts calls.
pub struct ScriptedClient {
    job_id: String,
    submit_error: Option<SubmissionError>,
    statuses: Mutex<VecDeque<Result<JobStatus, ClientError>>>,
    fallback: Option<JobStatus>,
    modules: Option<Value>,
    submits: AtomicUsize,
    queries: AtomicUsize,
    module_fetches: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            submit_error: None,
            statuses: Mutex::new(VecDeque::new()),
            fallback: None,
            modules: None,
            submits: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
            module_fetches: AtomicUsize::new(0),
        }
    }

    pub fn then_status(self, status: JobStatus) -> Self {
        self.statuses.lock().unwrap().push_back(Ok(status));
        self
    }

    pub fn then_error(self, error: ClientError) -> Self {
        self.statuses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Status returned once the scripted queue is empty.
    pub fn forever(mut self, status: JobStatus) -> Self {
        self.fallback = Some(status);
        self
    }

    pub fn failing_submit(mut self, error: SubmissionError) -> Self {
        self.submit_error = Some(error);
        self
    }

    pub fn with_modules(mut self, modules: Value) -> Self {
        self.modules = Some(modules);
        self
    }

    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn module_fetches(&self) -> usize {
        self.module_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl JobClient for ScriptedClient {
    async fn submit(&self, request: &JobRequest) -> Result<AsyncJob, SubmissionError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        match &self.submit_error {
            Some(err) => Err(err.clone()),
            None => Ok(AsyncJob::new(self.job_id.clone(), request.kind())),
        }
    }

    async fn query_status(&self, _job: &AsyncJob) -> Result<JobStatus, ClientError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(result), _) => result,
            (None, Some(status)) => Ok(status.clone()),
            (None, None) => Err(ClientError::Network("script exhausted".into())),
        }
    }

    async fn fetch_study_path_modules(&self, _study_path_id: &str) -> Result<Value, ClientError> {
        self.module_fetches.fetch_add(1, Ordering::SeqCst);
        self.modules
            .clone()
            .ok_or_else(|| ClientError::HttpStatus {
                status: 404,
                message: "Not Found".into(),
            })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<OperationUpdate>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<OperationUpdate> {
        self.updates.lock().unwrap().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.updates.lock().unwrap().len()
    }
}

impl UpdateSink for RecordingSink {
    fn emit(&self, update: OperationUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}
