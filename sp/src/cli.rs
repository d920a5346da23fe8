//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// Session used when `--session` is not given
pub const DEFAULT_SESSION: &str = "default";

/// StudyPlan - exam study plan generator
#[derive(Parser)]
#[command(
    name = "sp",
    about = "Generate validated exam study plans with an LLM",
    version,
    after_help = after_help()
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

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a study plan from survey answers
    Generate {
        /// Survey answers file (YAML or JSON)
        #[arg(short, long, value_name = "FILE")]
        survey: PathBuf,

        /// Session whose status is tracked
        #[arg(long, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Show the generation status of a session
    Status {
        #[arg(long, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Return a session to idle
    Reset {
        #[arg(long, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Inspect persisted plans
    Plan {
        #[command(subcommand)]
        command: PlanCommand,
    },

    /// Inspect and remove debug artifacts
    Artifacts {
        #[command(subcommand)]
        command: ArtifactsCommand,
    },
}

/// Plan subcommands
#[derive(Debug, Subcommand)]
pub enum PlanCommand {
    /// Print a persisted plan
    Show {
        /// Plan ID
        id: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Artifact subcommands
#[derive(Debug, Subcommand)]
pub enum ArtifactsCommand {
    /// List artifacts, newest first
    List {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Print an artifact's content
    Cat {
        /// Artifact filename
        name: String,
    },

    /// Delete an artifact
    Rm {
        /// Artifact filename
        name: String,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studyplan")
        .join("logs")
        .join("studyplan.log")
}

fn after_help() -> String {
    format!("Logs are written to: {}", get_log_path().display())
}

/// Output format for listing commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            _ => Err(format!("Unknown format: {}. Use: text, json, or table", s)),
        }
    }
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
    fn test_parse_generate() {
        let cli = Cli::try_parse_from(["sp", "-l", "debug", "generate", "--survey", "survey.yml"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Generate { survey, session } => {
                assert_eq!(survey, PathBuf::from("survey.yml"));
                assert_eq!(session, DEFAULT_SESSION);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_artifacts_list_format() {
        let cli = Cli::try_parse_from(["sp", "artifacts", "list", "--format", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Artifacts {
                command: ArtifactsCommand::List {
                    format: OutputFormat::Json
                }
            }
        ));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("plain".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
