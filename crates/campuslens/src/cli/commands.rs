//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::storage::Dataset;

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to bind (overrides the configuration)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides the configuration)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// Table to replace
    #[arg(value_enum)]
    pub dataset: DatasetArg,

    /// CSV file with a header row
    pub file: PathBuf,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Person id, device hash, email, or part of a name or email
    pub query: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Timeline command arguments.
#[derive(Debug, Args)]
pub struct TimelineCommand {
    /// Person to show
    pub person_id: String,

    /// Earliest timestamp to include (compared as text)
    #[arg(long)]
    pub start: Option<String>,

    /// Latest timestamp to include (compared as text)
    #[arg(long)]
    pub end: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Dataset argument for imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DatasetArg {
    /// Entity profiles
    Profile,
    /// Activity events (the `data` table)
    Activity,
    /// Wi-Fi associations
    Wifi,
}

impl From<DatasetArg> for Dataset {
    fn from(arg: DatasetArg) -> Self {
        match arg {
            DatasetArg::Profile => Self::Profile,
            DatasetArg::Activity => Self::Activity,
            DatasetArg::Wifi => Self::Wifi,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
