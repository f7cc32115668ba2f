use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use engine_logging::{LevelFilter, LogDestination};
use learnpath_core::{JobRequest, OverlapPolicy, UserId};

/// Drive study-path, quiz and audio generation jobs against a Learnpath backend.
#[derive(Debug, Parser)]
#[command(name = "learnpath", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// RON configuration file. Defaults to ./learnpath.ron when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:3000/api/
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Signed-in user the jobs are submitted for.
    #[arg(long, global = true, default_value_t = 1)]
    pub user_id: i64,

    /// What to do when a job for the same key is already running.
    #[arg(long, global = true, value_enum, default_value_t = Overlap::Ignore)]
    pub overlap: Overlap,

    #[arg(long, global = true, value_enum, default_value_t = LogTarget::Terminal)]
    pub log: LogTarget,

    /// Log status queries and other debug detail.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a study path for a topic.
    StudyPath {
        #[arg(long)]
        topic: String,
    },
    /// Generate the quiz of a module.
    Quiz {
        #[arg(long)]
        module_id: String,
    },
    /// Synthesize speech for a text.
    Tts {
        #[arg(long)]
        text: String,
        #[arg(long)]
        module_id: Option<String>,
        /// Ask for the same audio again this many times after it is ready.
        #[arg(long, default_value_t = 0)]
        repeat: u32,
    },
    /// Render an agent tool result given as JSON.
    ToolResult { json: String },
}

impl Command {
    /// Requests to trigger one after the other, or `None` for commands that submit nothing.
    pub fn requests(&self, user_id: UserId) -> Option<Vec<JobRequest>> {
        let requests = match self {
            Command::StudyPath { topic } => vec![JobRequest::StudyPath {
                topic: topic.clone(),
                user_id,
            }],
            Command::Quiz { module_id } => vec![JobRequest::Quiz {
                module_id: module_id.clone(),
            }],
            Command::Tts {
                text,
                module_id,
                repeat,
            } => {
                let request = JobRequest::Tts {
                    text: text.clone(),
                    user_id,
                    module_id: module_id.clone(),
                };
                vec![request; *repeat as usize + 1]
            }
            Command::ToolResult { .. } => return None,
        };
        Some(requests)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Overlap {
    Ignore,
    Supersede,
}

impl From<Overlap> for OverlapPolicy {
    fn from(value: Overlap) -> Self {
        match value {
            Overlap::Ignore => OverlapPolicy::Ignore,
            Overlap::Supersede => OverlapPolicy::Supersede,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(value: LogTarget) -> Self {
        match value {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn tts_repeat_queues_identical_requests() {
        let cli = Cli::parse_from(["learnpath", "tts", "--text", "Hola", "--repeat", "2"]);
        let requests = cli.command.requests(UserId(cli.global.user_id)).unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::parse_from([
            "learnpath",
            "quiz",
            "--module-id",
            "12",
            "--user-id",
            "7",
            "--overlap",
            "supersede",
            "-v",
        ]);
        assert_eq!(cli.global.user_id, 7);
        assert_eq!(cli.global.overlap, Overlap::Supersede);
        assert_eq!(cli.global.log_level(), LevelFilter::Debug);
        assert_eq!(
            cli.command.requests(UserId(7)),
            Some(vec![JobRequest::Quiz {
                module_id: "12".into()
            }])
        );
    }

    #[test]
    fn tool_result_submits_nothing() {
        let cli = Cli::parse_from(["learnpath", "tool-result", "{}"]);
        assert_eq!(cli.command.requests(UserId(1)), None);
    }
}
