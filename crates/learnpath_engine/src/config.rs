use std::time::Duration;

use learnpath_core::{JobKind, DEFAULT_AUDIO_CACHE_CAPACITY};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Path templates relative to the base URL. `{id}` is replaced by the
/// request, job or module identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Routes {
    pub study_path_submit: String,
    pub study_path_status: String,
    pub study_path_modules: String,
    pub quiz_submit: String,
    pub quiz_fetch: String,
    pub tts_submit: String,
    pub tts_status: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            study_path_submit: "study-paths/generate".to_string(),
            study_path_status: "study-paths/requests/{id}".to_string(),
            study_path_modules: "study-paths/{id}/modules".to_string(),
            quiz_submit: "quiz/generate/{id}".to_string(),
            quiz_fetch: "quiz/module/{id}".to_string(),
            tts_submit: "text-to-speech".to_string(),
            tts_status: "text-to-speech/{id}".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout_millis: u64,
    pub request_timeout_millis: u64,
    pub routes: Routes,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api/".to_string(),
            connect_timeout_millis: 10_000,
            request_timeout_millis: 30_000,
            routes: Routes::default(),
        }
    }
}

impl ClientSettings {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_millis)
    }
}

/// Cadence and budget of one poll session. Timeout is `interval × max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    pub interval_millis: u64,
    pub max_attempts: u32,
}

impl PollSettings {
    pub const fn new(interval_millis: u64, max_attempts: u32) -> Self {
        Self {
            interval_millis,
            max_attempts,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_millis)
    }

    /// Saturates at [`Duration::MAX`].
    pub fn budget(&self) -> Duration {
        self.interval().saturating_mul(self.max_attempts)
    }
}

/// Per-kind poll settings. When deserialized, every missing kind or field
/// keeps that kind's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PollConfigPatch")]
pub struct PollConfig {
    pub study_path: PollSettings,
    pub quiz: PollSettings,
    pub tts: PollSettings,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            study_path: PollSettings::new(6_000, 20),
            quiz: PollSettings::new(5_000, 20),
            tts: PollSettings::new(3_000, 20),
        }
    }
}

impl PollConfig {
    /// Same settings for every job kind.
    pub fn uniform(settings: PollSettings) -> Self {
        Self {
            study_path: settings,
            quiz: settings,
            tts: settings,
        }
    }

    pub fn for_kind(&self, kind: JobKind) -> PollSettings {
        match kind {
            JobKind::StudyPath => self.study_path,
            JobKind::Quiz => self.quiz,
            JobKind::Tts => self.tts,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename = "PollConfig")]
struct PollConfigPatch {
    study_path: PollSettingsPatch,
    quiz: PollSettingsPatch,
    tts: PollSettingsPatch,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(default, rename = "PollSettings")]
struct PollSettingsPatch {
    #[serde(deserialize_with = "present")]
    interval_millis: Option<u64>,
    #[serde(deserialize_with = "present")]
    max_attempts: Option<u32>,
}

impl PollSettingsPatch {
    fn or(self, defaults: PollSettings) -> PollSettings {
        PollSettings {
            interval_millis: self.interval_millis.unwrap_or(defaults.interval_millis),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
        }
    }
}

impl From<PollConfigPatch> for PollConfig {
    fn from(patch: PollConfigPatch) -> Self {
        let defaults = Self::default();
        Self {
            study_path: patch.study_path.or(defaults.study_path),
            quiz: patch.quiz.or(defaults.quiz),
            tts: patch.tts.or(defaults.tts),
        }
    }
}

/// Reads a plain value into `Some`, so config files need no `Some(..)` wrapper.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub client: ClientSettings,
    pub polling: PollConfig,
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            client: ClientSettings::default(),
            polling: PollConfig::default(),
            cache_capacity: DEFAULT_AUDIO_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid base url {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("{kind} polling needs a non-zero interval")]
    ZeroInterval { kind: JobKind },
    #[error("{kind} polling needs at least one attempt")]
    ZeroAttempts { kind: JobKind },
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        reqwest::Url::parse(&self.client.base_url).map_err(|err| ConfigError::BaseUrl {
            url: self.client.base_url.clone(),
            reason: err.to_string(),
        })?;
        for kind in [JobKind::StudyPath, JobKind::Quiz, JobKind::Tts] {
            let settings = self.polling.for_kind(kind);
            if settings.interval_millis == 0 {
                return Err(ConfigError::ZeroInterval { kind });
            }
            if settings.max_attempts == 0 {
                return Err(ConfigError::ZeroAttempts { kind });
            }
        }
        Ok(())
    }
}
