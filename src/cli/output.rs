//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, SymshardArgs};
use crate::error::Result;

/// One displayed search hit.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub label: String,
    pub qualified_label: String,
    pub target: String,
    pub shard_id: String,
    pub external: bool,
}

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchReport {
    pub query: String,
    pub sections: Vec<String>,
    pub candidates: Vec<String>,
    pub hits: Vec<SearchHit>,
    pub total_matches: usize,
    pub truncated: bool,
    pub failed_shards: Vec<String>,
    pub duration_ms: u64,
}

/// One entry of an inspected shard.
#[derive(Debug, Serialize, Deserialize)]
pub struct EntrySummary {
    pub key: String,
    pub label: String,
    pub occurrences: usize,
}

/// Result structure for shard inspection.
#[derive(Debug, Serialize, Deserialize)]
pub struct ShardReport {
    pub shard_id: String,
    pub entries: Vec<EntrySummary>,
    pub total_occurrences: usize,
}

/// A shard that failed validation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ShardProblem {
    pub shard_id: String,
    pub error: String,
}

/// Result structure for index validation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationReport {
    pub search_dir: String,
    pub sections: Vec<String>,
    pub shards_checked: usize,
    pub shards_valid: usize,
    pub total_entries: usize,
    pub missing: Vec<String>,
    pub invalid: Vec<ShardProblem>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }
}

/// Plain-text rendering of a command result.
pub trait HumanOutput {
    fn print_human(&self, args: &SymshardArgs);
}

impl HumanOutput for SearchReport {
    fn print_human(&self, args: &SymshardArgs) {
        if self.hits.is_empty() {
            println!("No matches for '{}'", self.query);
        }

        for hit in &self.hits {
            let marker = if hit.external { " [external]" } else { "" };
            println!("{:<24} {}{}", hit.label, hit.qualified_label, marker);
            if args.verbosity() > 1 {
                println!("{:<24} -> {} ({})", "", hit.target, hit.shard_id);
            }
        }

        if self.truncated {
            println!(
                "... {} more not shown",
                self.total_matches.saturating_sub(self.hits.len())
            );
        }

        if !self.failed_shards.is_empty() {
            println!("Unavailable shards: {}", self.failed_shards.join(", "));
        }

        if args.verbosity() > 1 {
            println!();
            println!("Sections: {}", self.sections.join(", "));
            println!("Shards searched: {}", self.candidates.join(", "));
            println!("Search time: {}ms", self.duration_ms);
        }
    }
}

impl HumanOutput for ShardReport {
    fn print_human(&self, args: &SymshardArgs) {
        println!("Shard {}", self.shard_id);
        println!("═══════════════");
        for entry in &self.entries {
            if args.verbosity() > 1 {
                println!("{:<24} {:<32} {}", entry.label, entry.key, entry.occurrences);
            } else {
                println!("{:<24} {}", entry.label, entry.occurrences);
            }
        }
        println!();
        println!(
            "{} entries, {} occurrences",
            self.entries.len(),
            self.total_occurrences
        );
    }
}

impl HumanOutput for ValidationReport {
    fn print_human(&self, _args: &SymshardArgs) {
        println!("Index: {}", self.search_dir);
        println!("Sections: {}", self.sections.join(", "));
        println!(
            "Shards: {}/{} valid, {} entries",
            self.shards_valid, self.shards_checked, self.total_entries
        );

        if !self.missing.is_empty() {
            println!();
            println!("Missing:");
            for shard_id in &self.missing {
                println!("  {shard_id}");
            }
        }

        if !self.invalid.is_empty() {
            println!();
            println!("Invalid:");
            for problem in &self.invalid {
                println!("  {}: {}", problem.shard_id, problem.error);
            }
        }

        println!();
        println!(
            "Status: {}",
            if self.is_valid() { "OK" } else { "FAILED" }
        );
    }
}

/// Output a result in the specified format.
pub fn output_result<T>(result: &T, args: &SymshardArgs) -> Result<()>
where
    T: Serialize + HumanOutput,
{
    match args.output_format {
        OutputFormat::Human => {
            result.print_human(args);
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &SymshardArgs) -> Result<()> {
    println!("{}", to_json(result, args.pretty)?);
    Ok(())
}

pub fn to_json<T: Serialize>(result: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    Ok(json)
}
