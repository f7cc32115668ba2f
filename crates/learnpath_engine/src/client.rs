use engine_logging::{engine_debug, engine_info};
use learnpath_core::{optional_id, JobKind, JobRequest};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::{ClientSettings, Routes};
use crate::{AsyncJob, ClientError, JobState, JobStatus, SubmissionError};

const MAX_ERROR_BODY_CHARS: usize = 200;

/// HTTP contract of the asynchronous generation backend.
#[async_trait::async_trait]
pub trait JobClient: Send + Sync {
    /// Creates a job. Exactly one request, never retried.
    async fn submit(&self, request: &JobRequest) -> Result<AsyncJob, SubmissionError>;

    /// Reads the current status of a job. Exactly one request.
    async fn query_status(&self, job: &AsyncJob) -> Result<JobStatus, ClientError>;

    /// Reads the generated modules of a finished study path.
    async fn fetch_study_path_modules(&self, study_path_id: &str) -> Result<Value, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestJobClient {
    client: reqwest::Client,
    base_url: Url,
    routes: Routes,
}

impl ReqwestJobClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let mut base = settings.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|err| ClientError::InvalidUrl(err.to_string()))?;

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .build()
            .map_err(|err| ClientError::Network(err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            routes: settings.routes.clone(),
        })
    }

    /// Resolves a route template against the base URL. `{id}` segments are
    /// replaced by `id`, percent-encoded as a single path segment.
    fn endpoint(&self, template: &str, id: Option<&str>) -> Result<Url, ClientError> {
        if id.is_none() && template.contains("{id}") {
            return Err(ClientError::InvalidUrl(format!("route {template:?} needs an id")));
        }
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                ClientError::InvalidUrl(format!("{} cannot be a base url", self.base_url))
            })?;
            segments.pop_if_empty();
            for segment in template.split('/').filter(|segment| !segment.is_empty()) {
                match id {
                    Some(id) if segment == "{id}" => segments.push(id),
                    _ => segments.push(segment),
                };
            }
        }
        Ok(url)
    }

    async fn exchange(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(StatusCode, String), ClientError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        Ok((status, text))
    }

    async fn get_json(&self, url: Url) -> Result<Value, ClientError> {
        let (status, text) = self.exchange(self.client.get(url)).await?;
        success_body(status, &text)
    }

    async fn query_quiz(&self, module_id: &str) -> Result<JobStatus, ClientError> {
        let url = self.endpoint(&self.routes.quiz_fetch, Some(module_id))?;
        let (status, text) = self.exchange(self.client.get(url)).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(JobStatus::pending());
        }
        let body = unwrap_envelope(success_body(status, &text)?);
        if body.is_null() {
            return Ok(JobStatus::pending());
        }
        let shape = QuizBody::deserialize(&body).map_err(decode_error)?;
        if shape.status.is_some() {
            return status_from_body(body);
        }
        match shape.quiz {
            Some(_) => Ok(JobStatus::completed(body)),
            None => Ok(JobStatus::pending()),
        }
    }
}

#[async_trait::async_trait]
impl JobClient for ReqwestJobClient {
    async fn submit(&self, request: &JobRequest) -> Result<AsyncJob, SubmissionError> {
        let kind = request.kind();
        let builder = match request {
            JobRequest::StudyPath { topic, user_id } => {
                let url = self.endpoint(&self.routes.study_path_submit, None)?;
                self.client
                    .post(url)
                    .json(&serde_json::json!({ "topic": topic, "userId": user_id }))
            }
            JobRequest::Quiz { module_id } => {
                let url = self.endpoint(&self.routes.quiz_submit, Some(module_id))?;
                self.client.post(url)
            }
            JobRequest::Tts {
                text,
                user_id,
                module_id,
            } => {
                let url = self.endpoint(&self.routes.tts_submit, None)?;
                let mut body = Map::new();
                body.insert("text".into(), Value::from(text.as_str()));
                body.insert("userId".into(), Value::from(user_id.0));
                if let Some(module_id) = module_id {
                    body.insert("moduleId".into(), id_value(module_id));
                }
                self.client.post(url).json(&body)
            }
        };

        let (status, text) = self.exchange(builder).await?;
        let body = unwrap_envelope(success_body(status, &text)?);
        let accepted = AcceptedBody::deserialize(&body).unwrap_or_default();

        let job_id = match request {
            JobRequest::Quiz { module_id } => Some(module_id.clone()),
            JobRequest::StudyPath { .. } => accepted.request_id.or(accepted.id),
            JobRequest::Tts { .. } => accepted.job_id.or(accepted.id),
        }
        .ok_or(SubmissionError::MissingJobId { kind })?;

        engine_info!(
            "Submitted {} job {} (http {})",
            kind,
            job_id,
            status.as_u16()
        );
        Ok(AsyncJob::new(job_id, kind))
    }

    async fn query_status(&self, job: &AsyncJob) -> Result<JobStatus, ClientError> {
        let status = match job.kind {
            JobKind::Quiz => self.query_quiz(&job.job_id).await?,
            JobKind::StudyPath => {
                let url = self.endpoint(&self.routes.study_path_status, Some(&job.job_id))?;
                status_from_body(unwrap_envelope(self.get_json(url).await?))?
            }
            JobKind::Tts => {
                let url = self.endpoint(&self.routes.tts_status, Some(&job.job_id))?;
                status_from_body(unwrap_envelope(self.get_json(url).await?))?
            }
        };
        engine_debug!("{} job {} is {}", job.kind, job.job_id, status.state);
        Ok(status)
    }

    async fn fetch_study_path_modules(&self, study_path_id: &str) -> Result<Value, ClientError> {
        let url = self.endpoint(&self.routes.study_path_modules, Some(study_path_id))?;
        let body = unwrap_envelope(self.get_json(url).await?);
        match ModuleList::deserialize(body) {
            Ok(ModuleList::Bare(modules) | ModuleList::Wrapped { modules }) => {
                Ok(Value::Array(modules))
            }
            Err(_) => Err(ClientError::Decode("module list missing".into())),
        }
    }
}

/// `{ "status": ..., "error"?: ..., "message"?: ... }` as returned by the status routes.
#[derive(Deserialize)]
struct StatusBody {
    status: JobState,
    #[serde(flatten)]
    detail: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn reason(self) -> Option<String> {
        [self.error, self.message]
            .into_iter()
            .flatten()
            .map(|text| text.trim().to_string())
            .find(|text| !text.is_empty())
    }
}

#[derive(Deserialize)]
struct Envelope {
    success: bool,
    data: Option<Value>,
}

/// Body of a 200/202 job creation response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AcceptedBody {
    #[serde(
        rename = "requestId",
        alias = "request_id",
        deserialize_with = "optional_id"
    )]
    request_id: Option<String>,
    #[serde(rename = "jobId", alias = "job_id", deserialize_with = "optional_id")]
    job_id: Option<String>,
    #[serde(deserialize_with = "optional_id")]
    id: Option<String>,
}

/// Module route body: a bare array or `{ "modules": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ModuleList {
    Bare(Vec<Value>),
    Wrapped { modules: Vec<Value> },
}

/// Quiz route body. A `null` or missing `quiz` means not generated yet.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuizBody {
    status: Option<Value>,
    quiz: Option<Value>,
}

/// Parses a status body into a [`JobStatus`]. The whole body is the payload when completed.
pub(crate) fn status_from_body(body: Value) -> Result<JobStatus, ClientError> {
    let parsed = StatusBody::deserialize(&body).map_err(decode_error)?;
    Ok(match parsed.status {
        JobState::Pending => JobStatus::pending(),
        JobState::Processing => JobStatus::processing(),
        JobState::Failed => JobStatus::failed(parsed.detail.reason()),
        JobState::Completed => JobStatus::completed(body),
    })
}

/// Unwraps a `{ "success": true, "data": ... }` envelope; other bodies pass through.
pub(crate) fn unwrap_envelope(body: Value) -> Value {
    match Envelope::deserialize(&body) {
        Ok(Envelope {
            success: true,
            data: Some(data),
        }) => data,
        _ => body,
    }
}

fn success_body(status: StatusCode, text: &str) -> Result<Value, ClientError> {
    if !status.is_success() {
        return Err(ClientError::HttpStatus {
            status: status.as_u16(),
            message: backend_message(status, text),
        });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|err| ClientError::Decode(err.to_string()))
}

fn backend_message(status: StatusCode, text: &str) -> String {
    if let Some(reason) = serde_json::from_str::<ErrorBody>(text)
        .ok()
        .and_then(ErrorBody::reason)
    {
        return reason;
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Numeric module ids travel as JSON numbers, anything else as strings.
fn id_value(id: &str) -> Value {
    id.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(id))
}

fn decode_error(err: serde_json::Error) -> ClientError {
    ClientError::Decode(err.to_string())
}

fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        return ClientError::Timeout;
    }
    if err.is_decode() {
        return ClientError::Decode(err.to_string());
    }
    ClientError::Network(err.to_string())
}
