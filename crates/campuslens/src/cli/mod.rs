//! Command-line interface for campuslens.
//!
//! This module provides the CLI structure for the `campuslens` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DatasetArg, ImportCommand, OutputFormat, SearchCommand, ServeCommand,
    StatsCommand, TimelineCommand,
};

/// campuslens - Campus activity dashboard API
///
/// Serves profile, activity and Wi-Fi records imported from CSV to the
/// dashboard client, and answers the same queries from the command line.
#[derive(Debug, Parser)]
#[command(name = "campuslens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeCommand),

    /// Replace a table with the contents of a CSV file
    Import(ImportCommand),

    /// Show dashboard counts and rankings
    Stats(StatsCommand),

    /// Search profiles
    Search(SearchCommand),

    /// Show a person's activity timeline
    Timeline(TimelineCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn stats_cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Stats(StatsCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "campuslens");
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;

        assert_eq!(stats_cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(stats_cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(stats_cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(stats_cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_quiet_wins_over_verbose() {
        assert_eq!(
            stats_cli(2, true).verbosity(),
            crate::logging::Verbosity::Quiet
        );
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["campuslens", "serve", "--host", "127.0.0.1", "-p", "8080"])
            .unwrap();
        let Command::Serve(serve) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(serve.port, Some(8080));
    }

    #[test]
    fn test_parse_import() {
        let cli = Cli::try_parse_from(["campuslens", "import", "wifi", "/tmp/wifi.csv"]).unwrap();
        let Command::Import(import) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(import.dataset, DatasetArg::Wifi);
        assert_eq!(import.file, PathBuf::from("/tmp/wifi.csv"));
    }

    #[test]
    fn test_parse_import_rejects_unknown_dataset() {
        assert!(Cli::try_parse_from(["campuslens", "import", "alerts", "a.csv"]).is_err());
    }

    #[test]
    fn test_parse_search_default_format() {
        let cli = Cli::try_parse_from(["campuslens", "search", "alice"]).unwrap();
        let Command::Search(search) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(search.query, "alice");
        assert_eq!(search.format, OutputFormat::Table);
    }

    #[test]
    fn test_parse_timeline_bounds() {
        let cli = Cli::try_parse_from([
            "campuslens",
            "timeline",
            "p1",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-10",
            "-f",
            "json",
        ])
        .unwrap();
        let Command::Timeline(timeline) = cli.command else {
            panic!("expected timeline");
        };
        assert_eq!(timeline.person_id, "p1");
        assert_eq!(timeline.start.as_deref(), Some("2024-01-01"));
        assert_eq!(timeline.end.as_deref(), Some("2024-01-10"));
        assert_eq!(timeline.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_config_validate() {
        let cli =
            Cli::try_parse_from(["campuslens", "config", "validate", "--file", "/tmp/c.toml"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let args = vec!["campuslens", "-c", "/custom/config.toml", "stats"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_verbose_and_quiet() {
        let cli = Cli::try_parse_from(["campuslens", "-v", "stats", "--json"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Command::Stats(StatsCommand { json: true })));

        let cli = Cli::try_parse_from(["campuslens", "-q", "stats"]).unwrap();
        assert!(cli.quiet);
    }
}
