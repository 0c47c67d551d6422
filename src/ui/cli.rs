//! Command-line interface definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ioc-sweep: sweep files, connections and processes for known indicators
#[derive(Parser, Debug)]
#[command(name = "ioc-sweep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Use a specific configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine processing
    Json,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one scan pass and store the report
    Scan {
        /// Print the report without storing it
        #[arg(long)]
        no_store: bool,

        /// Override the number of hashing workers
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Browse stored scan reports
    Reports {
        #[command(subcommand)]
        action: ReportAction,
    },

    /// Manage scan settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Show the latest report and indicator cache state
    Status,

    /// Show application information
    Info,
}

/// Report subcommands.
#[derive(Subcommand, Debug)]
pub enum ReportAction {
    /// List recent reports
    List {
        /// Number of recent reports to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show one report
    Show {
        /// Report timestamp
        timestamp: String,
    },

    /// Delete one report
    Delete {
        /// Report timestamp
        timestamp: String,
    },

    /// Delete all reports
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Settings subcommands.
#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Show current scan settings
    Show,

    /// Replace scan settings with a JSON file
    Import {
        /// Settings file to import
        file: PathBuf,
    },

    /// Reset scan settings to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Print the settings file location
    Path,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
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
    fn test_parse_scan_with_global_flags() {
        let cli = Cli::try_parse_from(["ioc-sweep", "scan", "--workers", "8", "-v", "--format", "json"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Some(Commands::Scan { no_store, workers }) => {
                assert!(!no_store);
                assert_eq!(workers, Some(8));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_report_show() {
        let cli = Cli::try_parse_from(["ioc-sweep", "reports", "show", "1700000000000"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Reports {
                action: ReportAction::Show { ref timestamp }
            }) if timestamp == "1700000000000"
        ));
    }

    #[test]
    fn test_parse_settings_import() {
        let cli = Cli::try_parse_from(["ioc-sweep", "settings", "import", "s.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Settings {
                action: SettingsAction::Import { .. }
            })
        ));
    }
}
