//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// musicwiki data checker and inspector
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Data directory path (relative to project root)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Config file name (default: musicwiki.toml)
    #[arg(short = 'C', long, default_value = "musicwiki.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile every kind, load the data and evaluate every property
    Check {
        /// Evaluate things in parallel
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        parallel: Option<bool>,

        /// Log each composite step as it runs
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        trace: Option<bool>,
    },

    /// Print a thing's resolved properties as JSON
    Dump {
        /// Thing reference, e.g. `album:homestuck-vol-1`
        reference: String,

        /// Only print this property
        property: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["musicwiki", "--data", "wiki", "check", "--parallel=false"]).unwrap();
        assert_eq!(cli.data, Some(PathBuf::from("wiki")));
        assert!(matches!(cli.command, Commands::Check { parallel: Some(false), trace: None }));
    }

    #[test]
    fn test_parse_check_flag_without_value() {
        let cli = Cli::try_parse_from(["musicwiki", "check", "--trace"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { parallel: None, trace: Some(true) }));
    }

    #[test]
    fn test_parse_dump() {
        let cli = Cli::try_parse_from(["musicwiki", "dump", "track:showtime", "album"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("musicwiki.toml"));
        match cli.command {
            Commands::Dump { reference, property } => {
                assert_eq!(reference, "track:showtime");
                assert_eq!(property.as_deref(), Some("album"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
