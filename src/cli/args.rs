//! Command line argument parsing for the symshard CLI using clap.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Symshard - prefix search over a sharded documentation symbol index
#[derive(Parser, Debug, Clone)]
#[command(name = "symshard")]
#[command(about = "Prefix search over a sharded documentation symbol index")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct SymshardArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl SymshardArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Search the index in a generated `search/` directory
    Search(SearchArgs),

    /// Parse one shard file and list its entries
    Inspect(InspectArgs),

    /// Parse every shard named by `searchdata.js` and report failures
    Validate(ValidateArgs),
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Directory holding `searchdata.js` and the shard files
    #[arg(value_name = "SEARCH_DIR")]
    pub search_dir: PathBuf,

    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Sections to search (repeatable); defaults to the configured sections
    #[arg(short, long = "section", value_name = "SECTION")]
    pub sections: Vec<String>,

    /// Maximum number of results to show (0 = unbounded)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Minimum query length
    #[arg(long)]
    pub min_len: Option<usize>,

    /// Search configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", env = "SYMSHARD_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Arguments for inspecting a shard
#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    /// Shard file, e.g. `search/all_11.js`
    #[arg(value_name = "SHARD_FILE")]
    pub shard_file: PathBuf,

    /// Shard id to report (defaults to the file stem)
    #[arg(long)]
    pub shard_id: Option<String>,
}

/// Arguments for validating an index
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Directory holding `searchdata.js` and the shard files
    #[arg(value_name = "SEARCH_DIR")]
    pub search_dir: PathBuf,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_command() {
        let args = SymshardArgs::try_parse_from([
            "symshard", "-vv", "search", "html/search", "siz", "-s", "all", "-s", "functions",
            "--limit", "5",
        ])
        .unwrap();

        assert_eq!(args.verbosity(), 2);
        match args.command {
            Command::Search(search) => {
                assert_eq!(search.query, "siz");
                assert_eq!(search.sections, vec!["all", "functions"]);
                assert_eq!(search.limit, Some(5));
                assert_eq!(search.min_len, None);
            }
            other => panic!("Expected search command, got {other:?}"),
        }
    }

    #[test]
    fn test_quiet_overrides_verbose() {
        let args =
            SymshardArgs::try_parse_from(["symshard", "-q", "-vvv", "validate", "search"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_json_format() {
        let args = SymshardArgs::try_parse_from([
            "symshard", "--format", "json", "inspect", "search/all_11.js",
        ])
        .unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
    }
}
