//! Domain records shared between the state machine and the engine.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of the acting user, as issued by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Explicit acting-user context handed to the state machine at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    StudyPath,
    Quiz,
    Tts,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::StudyPath => "study_path",
            JobKind::Quiz => "quiz",
            JobKind::Tts => "tts",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for one asynchronous backend job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    StudyPath { topic: String, user_id: UserId },
    Quiz { module_id: String },
    Tts {
        text: String,
        user_id: UserId,
        module_id: Option<String>,
    },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::StudyPath { .. } => JobKind::StudyPath,
            JobRequest::Quiz { .. } => JobKind::Quiz,
            JobRequest::Tts { .. } => JobKind::Tts,
        }
    }
}

/// Result of a finished job, in the shape the screens consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainResult {
    StudyPath(StudyPathRecord),
    Quiz(GeneratedQuiz),
    Audio(TtsAudio),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudyPathRecord {
    pub id: String,
    pub topic: String,
    pub user_id: UserId,
    pub created_at: String,
    pub modules: Vec<StudyModule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyModule {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    pub description: String,
    /// Missing or `null` subtopics mean the module has none.
    #[serde(default, deserialize_with = "string_list")]
    pub subtopics: Vec<String>,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuiz {
    pub quiz: QuizInfo,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizInfo {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(alias = "moduleId", deserialize_with = "id_string")]
    pub module_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    #[serde(default, alias = "correctAnswer")]
    pub correct_answer: Option<u32>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TtsAudio {
    pub job_id: String,
    pub audio_url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

/// Backend identifiers arrive either as JSON numbers or strings.
pub fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

/// Optional form of [`id_string`]. An empty string counts as absent.
pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    });
    Ok(id.filter(|id| !id.is_empty()))
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
