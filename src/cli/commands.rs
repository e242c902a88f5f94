//! Command implementations for the symshard CLI.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};

use crate::aggregator::ResultAggregator;
use crate::cli::args::*;
use crate::cli::output::*;
use crate::error::{Result, SymshardError};
use crate::loader::{DirectoryTransport, TransportLoader};
use crate::query::{QueryEngine, QueryOutcome, SearchConfig};
use crate::shard::parser::parse_shard;
use crate::shard::partition::{Partitioner, SectionPartitioner};
use crate::shard::record::LinkKind;
use crate::store::ShardStore;

/// Name of the partition index inside a search directory.
pub const SEARCHDATA_FILE: &str = "searchdata.js";

/// Execute a CLI command.
pub fn execute_command(args: SymshardArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match &args.command {
        Command::Search(search_args) => runtime.block_on(search(search_args.clone(), &args)),
        Command::Inspect(inspect_args) => inspect_shard(inspect_args.clone(), &args),
        Command::Validate(validate_args) => {
            runtime.block_on(validate_index(validate_args.clone(), &args))
        }
    }
}

/// Build an engine over a generated `search/` directory.
pub fn open_search_dir<P: AsRef<Path>>(search_dir: P, config: SearchConfig) -> Result<QueryEngine> {
    let search_dir = search_dir.as_ref();
    let partitioner = SectionPartitioner::load(search_dir.join(SEARCHDATA_FILE))?;
    debug!("{}", partitioner.description());

    let loader = TransportLoader::new(DirectoryTransport::new(search_dir));
    let store = ShardStore::new(Arc::new(loader)).with_load_timeout(config.load_timeout);

    QueryEngine::new(config, Arc::new(partitioner), Arc::new(store))
}

/// Run one query against an index directory.
async fn search(args: SearchArgs, cli_args: &SymshardArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            SearchConfig::from_json_file(path)?
        }
        None => SearchConfig::default(),
    };
    if !args.sections.is_empty() {
        config = config.with_sections(args.sections.clone());
    }
    if let Some(limit) = args.limit {
        config = config.with_capacity(limit);
    }
    if let Some(min_len) = args.min_len {
        config = config.with_min_query_len(min_len);
    }

    let engine = open_search_dir(&args.search_dir, config)?;
    let started = Instant::now();

    let results = match engine.search(&args.query).await {
        QueryOutcome::Completed(results) => results,
        QueryOutcome::Superseded { sequence } => {
            return Err(SymshardError::other(format!(
                "query #{sequence} was superseded"
            )));
        }
    };

    if results.is_unavailable() {
        return Err(SymshardError::other(format!(
            "search index unavailable: {}",
            results
                .failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        )));
    }
    for failure in &results.failures {
        warn!("{failure}");
    }

    let failed_shards = results
        .failures
        .iter()
        .map(|e| e.shard_id().to_string())
        .collect();
    let aggregated = ResultAggregator::new(engine.config().capacity).aggregate(results.matches);

    let report = SearchReport {
        query: results.query,
        sections: engine.sections(),
        candidates: results.candidates,
        hits: aggregated
            .results
            .into_iter()
            .map(|m| SearchHit {
                qualified_label: m.occurrence.display_qualified().into_owned(),
                external: m.occurrence.link_kind == LinkKind::External,
                label: m.display_label,
                target: m.occurrence.target,
                shard_id: m.shard_id,
            })
            .collect(),
        total_matches: aggregated.total_matches,
        truncated: aggregated.truncated,
        failed_shards,
        duration_ms: started.elapsed().as_millis() as u64,
    };

    output_result(&report, cli_args)
}

/// Parse a single shard file and summarize it.
fn inspect_shard(args: InspectArgs, cli_args: &SymshardArgs) -> Result<()> {
    let shard_id = match args.shard_id {
        Some(id) => id,
        None => args
            .shard_file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                SymshardError::other(format!(
                    "cannot derive a shard id from {}",
                    args.shard_file.display()
                ))
            })?,
    };

    let payload = std::fs::read_to_string(&args.shard_file)?;
    let record = parse_shard(&shard_id, &payload)?;

    let report = ShardReport {
        shard_id: record.shard_id().to_string(),
        entries: record
            .entries()
            .iter()
            .map(|entry| EntrySummary {
                key: entry.key.clone(),
                label: entry.display_label().into_owned(),
                occurrences: entry.occurrences.len(),
            })
            .collect(),
        total_occurrences: record.occurrence_count(),
    };

    output_result(&report, cli_args)
}

/// Load every shard named by the partition index.
async fn validate_index(args: ValidateArgs, cli_args: &SymshardArgs) -> Result<()> {
    let partitioner = SectionPartitioner::load(args.search_dir.join(SEARCHDATA_FILE))?;
    let loader = TransportLoader::new(DirectoryTransport::new(&args.search_dir));
    let store = ShardStore::new(Arc::new(loader));

    let shard_ids = partitioner.all_shards();
    info!("Validating {} shards", shard_ids.len());

    let mut report = ValidationReport {
        search_dir: args.search_dir.to_string_lossy().to_string(),
        sections: partitioner.sections(),
        shards_checked: shard_ids.len(),
        shards_valid: 0,
        total_entries: 0,
        missing: Vec::new(),
        invalid: Vec::new(),
    };

    for (shard_id, outcome) in store.preload(shard_ids).await {
        match outcome {
            Ok(record) => {
                report.shards_valid += 1;
                report.total_entries += record.len();
            }
            Err(e) if e.is_not_found() => report.missing.push(shard_id),
            Err(e) => report.invalid.push(ShardProblem {
                shard_id,
                error: e.to_string(),
            }),
        }
    }

    output_result(&report, cli_args)?;

    if report.is_valid() {
        Ok(())
    } else {
        Err(SymshardError::other(format!(
            "{} of {} shards failed validation",
            report.missing.len() + report.invalid.len(),
            report.shards_checked
        )))
    }
}
