use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

mod commands;

pub use commands::{check_secrets, exit_code, run_command, CheckReport};

#[derive(Parser)]
#[command(
    name = "doppler-bootstrap",
    version,
    about = "Load Doppler secrets into the environment, with an encrypted fallback"
)]
pub struct Cli {
    /// Log line format (stderr).
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load secrets, then run a command with them in its environment.
    Run(RunOpts),
    /// Load secrets into memory and report where they came from.
    Check(CheckOpts),
    Version,
}

#[derive(clap::Args)]
pub struct RunOpts {
    /// Fallback cache file (overrides DOPPLER_FALLBACK_FILE_PATH).
    #[arg(short, long)]
    pub fallback_file: Option<PathBuf>,
    /// Command and arguments to execute.
    #[arg(last = true, required = true, num_args = 1..)]
    pub command: Vec<String>,
}

#[derive(clap::Args)]
pub struct CheckOpts {
    /// Fallback cache file (overrides DOPPLER_FALLBACK_FILE_PATH).
    #[arg(short, long)]
    pub fallback_file: Option<PathBuf>,
    /// Print a JSON report instead of text.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_trailing_command() {
        let cli = Cli::parse_from([
            "doppler-bootstrap",
            "run",
            "--fallback-file",
            "/tmp/s.enc",
            "--",
            "bin/server",
            "--port",
            "8080",
        ]);
        match cli.command {
            Commands::Run(opts) => {
                assert_eq!(opts.fallback_file, Some(PathBuf::from("/tmp/s.enc")));
                assert_eq!(opts.command, vec!["bin/server", "--port", "8080"]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn run_requires_a_command() {
        assert!(Cli::try_parse_from(["doppler-bootstrap", "run"]).is_err());
    }

    #[test]
    fn parses_check_json_and_log_format() {
        let cli = Cli::parse_from(["doppler-bootstrap", "check", "--json", "--log-format", "json"]);
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Check(opts) => {
                assert!(opts.json);
                assert!(opts.fallback_file.is_none());
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
