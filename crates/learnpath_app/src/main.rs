mod cli;
mod config;
mod driver;
mod render;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use engine_logging::{engine_info, engine_warn};
use learnpath_core::{
    AppState, AppViewModel, JobRequest, Msg, OpKey, OperationState, Session, UserId,
};
use learnpath_engine::{EngineConfig, EngineHandle};

use cli::{Cli, Command};
use driver::{Driver, EffectRunner};

fn main() -> Result<()> {
    let cli = Cli::parse();
    engine_logging::initialize(cli.global.log.into(), cli.global.log_level());

    let session = Session::new(UserId(cli.global.user_id));
    let Some(requests) = cli.command.requests(session.user_id) else {
        if let Command::ToolResult { json } = &cli.command {
            let text = render::tool_result(json).context("tool result is not valid JSON")?;
            println!("{text}");
        }
        return Ok(());
    };

    let config = config::load(cli.global.config.as_deref())?;
    let config = config::resolve(config, &cli.global)?;
    engine_info!("Using backend {}", config.client.base_url);

    let engine = EngineHandle::new(&config).context("starting engine")?;
    let state = AppState::new(session)
        .with_policy(cli.global.overlap.into())
        .with_cache_capacity(config.cache_capacity);
    let mut driver = Driver::new(state, EffectRunner::new(engine));

    let outcome = run_requests(&mut driver, &config, requests);
    driver.close();
    outcome
}

fn run_requests(
    driver: &mut Driver,
    config: &EngineConfig,
    requests: Vec<JobRequest>,
) -> Result<()> {
    for request in requests {
        let key = OpKey::for_request(&request);
        let timeout = settle_timeout(config, &request);

        driver.dispatch(Msg::Dismiss(key.clone()));
        if let Some(view) = driver.dispatch(Msg::Trigger(request)) {
            print_view(&view);
        }
        if !driver.run_until_settled(timeout, print_view) {
            engine_warn!("Gave up on {} after {:?}", key, timeout);
            driver.dispatch(Msg::Cancel(key.clone()));
            bail!("{key} did not finish within {}s", timeout.as_secs());
        }
        let settled = driver.state().map(|state| state.operation(&key));
        if let Some(OperationState::Error(failure)) = settled {
            bail!("{key} failed: {}", failure.message);
        }
    }
    Ok(())
}

/// Upper bound for one operation: the poll budget plus a request timeout
/// for submission, each status query's overrun and the final fetch.
fn settle_timeout(config: &EngineConfig, request: &JobRequest) -> Duration {
    let polling = config.polling.for_kind(request.kind());
    let per_request = config
        .client
        .request_timeout()
        .saturating_add(config.client.connect_timeout());
    let requests = polling.max_attempts.saturating_add(2);
    polling
        .budget()
        .saturating_add(per_request.saturating_mul(requests))
}

fn print_view(view: &AppViewModel) {
    for line in render::render(view) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnpath_engine::{PollConfig, PollSettings};

    fn tts() -> JobRequest {
        JobRequest::Tts {
            text: "Hi".into(),
            user_id: UserId(1),
            module_id: None,
        }
    }

    #[test]
    fn settle_timeout_covers_budget_and_requests() {
        let config = EngineConfig {
            polling: PollConfig::uniform(PollSettings::new(100, 3)),
            ..EngineConfig::default()
        };
        let per_request = config.client.request_timeout() + config.client.connect_timeout();

        assert_eq!(
            settle_timeout(&config, &tts()),
            Duration::from_millis(300) + per_request * 5
        );
    }

    #[test]
    fn settle_timeout_saturates_on_huge_settings() {
        let mut config = EngineConfig {
            polling: PollConfig::uniform(PollSettings::new(u64::MAX, 20_000)),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(settle_timeout(&config, &tts()), Duration::MAX);

        config.polling = PollConfig::uniform(PollSettings::new(1, u32::MAX));
        config.client.request_timeout_millis = u64::MAX;
        assert_eq!(settle_timeout(&config, &tts()), Duration::MAX);
    }
}
