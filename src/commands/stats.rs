use crate::cli::StatsArgs;
use crate::commands::output::print_stats_summary;
use crate::commands::parse::{expand_globs, read_entries, RawStamp};
use crate::config::RepositoryConfig;
use crate::entry_parsers::EntryParserFactory;
use crate::ingest_pool::{IngestConfig, IngestPool};
use colored::*;

pub fn run_stats(args: StatsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = RepositoryConfig::load(&args.config)?;
    let files = expand_globs(&args.files)?;

    if files.is_empty() {
        eprintln!("No files matched the given patterns");
        return Ok(());
    }

    let stamp = args.raw.then(|| RawStamp {
        source: "cli".to_string(),
        host: "localhost".to_string(),
        severity: "6".to_string(),
    });
    let (entries, malformed) = read_entries(&files, stamp.as_ref())?;

    let pool_config = IngestConfig {
        num_workers: args.parallel,
        ..IngestConfig::default()
    };
    let pool = IngestPool::with_config(config, EntryParserFactory::new(), pool_config)?;
    let report = pool.run(entries)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.statistics)?);
        return Ok(());
    }

    print_stats_summary(&report.statistics, malformed);
    println!("\n{}", "Details".cyan().bold());
    print!("{}", report.statistics.generate_report());
    Ok(())
}
