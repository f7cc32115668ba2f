//! Turns terminal job payloads into the records the screens consume.
//!
//! Pure: no IO. A required field that is missing or mistyped is a
//! [`MalformedResult`], never a silent default.

use learnpath_core::{
    optional_id, DomainResult, GeneratedQuiz, JobKind, JobRequest, StudyModule, StudyPathRecord,
    TtsAudio,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::client::unwrap_envelope;
use crate::{AsyncJob, MalformedResult};

#[derive(Deserialize)]
struct StudyPathRef {
    #[serde(
        rename = "studyPathId",
        alias = "study_path_id",
        default,
        deserialize_with = "optional_id"
    )]
    id: Option<String>,
}

#[derive(Deserialize)]
struct StudyPathBody {
    #[serde(
        rename = "createdAt",
        alias = "created_at",
        default,
        deserialize_with = "non_blank_text"
    )]
    created_at: Option<String>,
    #[serde(default)]
    modules: Option<Vec<StudyModule>>,
}

#[derive(Deserialize)]
struct AudioBody {
    #[serde(
        rename = "audioUrl",
        alias = "audio_url",
        default,
        deserialize_with = "non_blank_text"
    )]
    audio_url: Option<String>,
}

pub fn project(
    job: &AsyncJob,
    request: &JobRequest,
    payload: &Value,
) -> Result<DomainResult, MalformedResult> {
    if request.kind() != job.kind {
        return Err(MalformedResult::new(
            job.kind,
            format!("job belongs to a {} request", request.kind()),
        ));
    }
    let payload = unwrap_envelope(payload.clone());

    match request {
        JobRequest::StudyPath { topic, user_id } => {
            let id = study_path_id(&payload)?;
            let body = StudyPathBody::deserialize(&payload)
                .map_err(|err| MalformedResult::new(JobKind::StudyPath, err.to_string()))?;
            let modules = body
                .modules
                .ok_or_else(|| MalformedResult::new(JobKind::StudyPath, "modules missing"))?;
            let created_at = body
                .created_at
                .unwrap_or_else(|| job.submitted_at.to_rfc3339());

            Ok(DomainResult::StudyPath(StudyPathRecord {
                id,
                topic: topic.clone(),
                user_id: *user_id,
                created_at,
                modules,
            }))
        }
        JobRequest::Quiz { .. } => {
            let quiz = GeneratedQuiz::deserialize(&payload)
                .map_err(|err| MalformedResult::new(JobKind::Quiz, err.to_string()))?;
            if quiz.questions.is_empty() {
                return Err(MalformedResult::new(JobKind::Quiz, "quiz has no questions"));
            }
            Ok(DomainResult::Quiz(quiz))
        }
        JobRequest::Tts { .. } => {
            let audio_url = AudioBody::deserialize(&payload)
                .ok()
                .and_then(|body| body.audio_url)
                .ok_or_else(|| MalformedResult::new(JobKind::Tts, "audio url missing"))?;
            Ok(DomainResult::Audio(TtsAudio {
                job_id: job.job_id.clone(),
                audio_url,
            }))
        }
    }
}

/// Identifier of the study path produced by a completed generation request.
pub fn study_path_id(payload: &Value) -> Result<String, MalformedResult> {
    StudyPathRef::deserialize(&unwrap_envelope(payload.clone()))
        .ok()
        .and_then(|reference| reference.id)
        .ok_or_else(|| MalformedResult::new(JobKind::StudyPath, "study path id missing"))
}

fn non_blank_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text),
        _ => None,
    })
}
