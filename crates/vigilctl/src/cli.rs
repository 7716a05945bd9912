//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Vigil CLI
#[derive(Parser, Debug)]
#[command(name = "vigilctl")]
#[command(about = "Vigil - single-host health check and scoring", long_about = None)]
#[command(version = env!("VIGIL_VERSION"))]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (overrides $VIGIL_CONFIG and the default search path)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand (defaults to `check`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a health check and print the report
    Check(CheckArgs),

    /// Collect readings and print them as JSON without scoring
    Readings {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show host information
    Host {
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Print built-in defaults instead of the loaded config
        #[arg(long)]
        default: bool,

        /// Write the default configuration to a path
        #[arg(long, value_name = "PATH", conflicts_with = "default")]
        write: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct CheckArgs {
    /// Output the report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Disable colors (NO_COLOR is honoured as well)
    #[arg(long)]
    pub no_color: bool,

    /// Do not write the JSON report file
    #[arg(long)]
    pub no_log: bool,

    /// Directory for the JSON report file
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Replay readings captured with `vigilctl readings`
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Override the pass deadline in milliseconds
    #[arg(long, value_name = "MS")]
    pub deadline_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check_flags() {
        let cli = Cli::try_parse_from([
            "vigilctl",
            "-vv",
            "check",
            "--json",
            "--no-log",
            "--snapshot",
            "pass.json",
            "--deadline-ms",
            "2500",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Check(args)) => {
                assert!(args.json);
                assert!(args.no_log);
                assert_eq!(args.snapshot, Some(PathBuf::from("pass.json")));
                assert_eq!(args.deadline_ms, Some(2500));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_no_subcommand_defaults() {
        let cli = Cli::try_parse_from(["vigilctl", "--config", "/tmp/v.toml"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/v.toml")));
    }

    #[test]
    fn test_config_flags_conflict() {
        assert!(Cli::try_parse_from(["vigilctl", "config", "--default", "--write", "x"]).is_err());
    }
}
