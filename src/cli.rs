//! CLI argument parsing for procstate-ledger

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for ledger reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "procstate-ledger")]
#[command(version)]
#[command(about = "Per-UID CPU time accounting by process state", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a JSON scenario through a ledger and print the resulting buckets
    Replay {
        /// Scenario file (JSON)
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,

        /// Ledger configuration file (TOML)
        #[arg(short = 'C', long = "config", value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,

        /// Exit with an error if any tick abandoned an entity update
        #[arg(long = "strict")]
        strict: bool,
    },

    /// Parse a uid_time_in_state file and print per-uid cumulative times
    Parse {
        /// File in uid_time_in_state layout
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_replay_defaults() {
        let cli = Cli::parse_from(["procstate-ledger", "replay", "scenario.json"]);
        assert!(!cli.debug);
        match cli.command {
            Command::Replay {
                scenario,
                config,
                format,
                strict,
            } => {
                assert_eq!(scenario, PathBuf::from("scenario.json"));
                assert!(config.is_none());
                assert_eq!(format, OutputFormat::Text);
                assert!(!strict);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_replay_all_flags() {
        let cli = Cli::parse_from([
            "procstate-ledger",
            "replay",
            "s.json",
            "--config",
            "ledger.toml",
            "--format",
            "json",
            "--strict",
            "--debug",
        ]);
        assert!(cli.debug);
        match cli.command {
            Command::Replay {
                config,
                format,
                strict,
                ..
            } => {
                assert_eq!(config, Some(PathBuf::from("ledger.toml")));
                assert_eq!(format, OutputFormat::Json);
                assert!(strict);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_command() {
        let cli = Cli::parse_from(["procstate-ledger", "--debug", "parse", "/proc/uid_time_in_state"]);
        assert!(cli.debug);
        assert!(matches!(cli.command, Command::Parse { .. }));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["procstate-ledger"]).is_err());
    }
}
