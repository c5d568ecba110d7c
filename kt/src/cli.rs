//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::tutor::LearnerProfile;

/// KhirMinTaki - chapter tutor with persistent progress
#[derive(Parser)]
#[command(
    name = "kt",
    about = "Chapter tutor that tracks each learner's progress",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Learner and chapter a command applies to
#[derive(Debug, Clone, Args)]
pub struct SessionArgs {
    /// Learner identifier (e.g. an email address)
    #[arg(short = 'u', long)]
    pub learner: String,

    /// Chapter identifier
    #[arg(short = 'k', long)]
    pub chapter: String,
}

/// Learner profile used to shape the tutor's instructions
#[derive(Debug, Clone, Args)]
pub struct ProfileArgs {
    /// Subject being studied
    #[arg(long, default_value = "Mathematics")]
    pub subject: String,

    /// Baccalaureate track
    #[arg(long, default_value = "Sciences")]
    pub track: String,

    /// Self-assessed level in the subject
    #[arg(long, default_value = "average")]
    pub level: String,

    /// Preferred teaching style
    #[arg(long, default_value = "step by step")]
    pub style: String,
}

impl From<ProfileArgs> for LearnerProfile {
    fn from(args: ProfileArgs) -> Self {
        Self {
            subject: args.subject,
            track: args.track,
            level: args.level,
            style: args.style,
        }
    }
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Chat with the tutor about a chapter
    Chat {
        #[command(flatten)]
        session: SessionArgs,

        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Show a learner's progress in a chapter
    Show {
        #[command(flatten)]
        session: SessionArgs,

        /// Print the full study plan and course summary
        #[arg(short, long)]
        full: bool,
    },

    /// Record a quiz score (0-100)
    Score {
        #[command(flatten)]
        session: SessionArgs,

        /// Score between 0 and 100
        #[arg(allow_negative_numbers = true)]
        score: i64,
    },

    /// Replace the study plan with the contents of a file
    Plan {
        #[command(flatten)]
        session: SessionArgs,

        /// File holding the new plan
        file: PathBuf,
    },

    /// List every chapter a learner has started
    List {
        /// Learner identifier
        #[arg(short = 'u', long)]
        learner: String,
    },
}

/// Path of the kt log file
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("khirmintaki")
        .join("logs")
        .join("khirmintaki.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_chat_profile_defaults() {
        let cli = Cli::try_parse_from(["kt", "chat", "-u", "a@x.com", "-k", "suites"]).unwrap();
        match cli.command {
            Command::Chat { session, profile } => {
                assert_eq!(session.learner, "a@x.com");
                assert_eq!(session.chapter, "suites");
                assert_eq!(LearnerProfile::from(profile), LearnerProfile::default());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_score_accepts_negative_for_validation() {
        let cli = Cli::try_parse_from(["kt", "score", "-u", "a@x.com", "-k", "suites", "-5"]).unwrap();
        assert!(matches!(cli.command, Command::Score { score: -5, .. }));
    }

    #[test]
    fn test_global_log_level() {
        let cli = Cli::try_parse_from(["kt", "list", "-u", "a@x.com", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_log_path_under_khirmintaki() {
        assert!(get_log_path().ends_with("khirmintaki/logs/khirmintaki.log"));
    }
}
