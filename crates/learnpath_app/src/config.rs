use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use engine_logging::{engine_debug, engine_info};
use learnpath_engine::EngineConfig;

use crate::cli::GlobalArgs;

pub(crate) const DEFAULT_CONFIG_FILENAME: &str = "learnpath.ron";

/// Reads the engine configuration.
///
/// An explicit `path` must exist. Without one, `./learnpath.ron` is used when
/// present and the built-in defaults otherwise. Fields missing from the file
/// keep their defaults.
pub(crate) fn load(path: Option<&Path>) -> Result<EngineConfig> {
    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILENAME), false),
    };
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound && !required => {
            engine_debug!("No config at {:?}, using defaults", path);
            return Ok(EngineConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("reading config {}", path.display()));
        }
    };

    let config: EngineConfig =
        ron::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
    engine_info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Applies command-line overrides and validates the result.
pub(crate) fn resolve(mut config: EngineConfig, args: &GlobalArgs) -> Result<EngineConfig> {
    if let Some(base_url) = &args.base_url {
        config.client.base_url = base_url.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use learnpath_engine::PollSettings;
    use pretty_assertions::assert_eq;

    use crate::cli::Cli;

    fn args(extra: &[&str]) -> GlobalArgs {
        let mut argv = vec!["learnpath"];
        argv.extend_from_slice(extra);
        argv.extend_from_slice(&["quiz", "--module-id", "1"]);
        Cli::parse_from(argv).global
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.ron");
        fs::write(
            &path,
            r#"(
                client: (base_url: "https://learn.example.com/api/"),
                polling: (tts: (interval_millis: 500, max_attempts: 4)),
            )"#,
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();

        assert_eq!(config.client.base_url, "https://learn.example.com/api/");
        assert_eq!(config.client.request_timeout_millis, 30_000);
        assert_eq!(config.polling.tts, PollSettings::new(500, 4));
        assert_eq!(config.polling.quiz, PollSettings::new(5_000, 20));
        assert_eq!(
            config.cache_capacity,
            EngineConfig::default().cache_capacity
        );
    }

    #[test]
    fn settings_missing_a_field_keep_kind_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.ron");
        fs::write(&path, "(polling: (tts: (interval_millis: 500)))").unwrap();

        let config = load(Some(&path)).unwrap();

        assert_eq!(config.polling.tts, PollSettings::new(500, 20));
        assert_eq!(config.polling.quiz, PollSettings::new(5_000, 20));
        assert_eq!(config.polling.study_path, PollSettings::new(6_000, 20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("absent.ron"))).unwrap_err();
        assert!(err.to_string().contains("absent.ron"));
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        fs::write(&path, "(client: ").unwrap();
        assert!(load(Some(&path)).is_err());
    }

    #[test]
    fn saved_config_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.ron");
        let mut config = EngineConfig::default();
        config.cache_capacity = 3;
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new()).unwrap();
        fs::write(&path, text).unwrap();

        assert_eq!(load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn base_url_flag_overrides_file() {
        let config = resolve(
            EngineConfig::default(),
            &args(&["--base-url", "http://127.0.0.1:9000/"]),
        )
        .unwrap();
        assert_eq!(config.client.base_url, "http://127.0.0.1:9000/");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = EngineConfig::default();
        config.polling.study_path.interval_millis = 0;
        assert!(resolve(config, &args(&[])).is_err());
        assert!(resolve(EngineConfig::default(), &args(&["--base-url", "nope"])).is_err());
    }
}
