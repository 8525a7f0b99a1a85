use crate::cli::ValidateArgs;
use crate::config::RepositoryConfig;
use crate::entry_parsers::EntryParserFactory;
use crate::error::ConfigError;
use crate::repository::Repository;
use colored::*;

/// One line per configured parser; errors are collected rather than stopping
/// at the first one.
pub fn validate_config(
    config: &RepositoryConfig,
    factory: &EntryParserFactory,
) -> Vec<(String, Result<String, ConfigError>)> {
    config
        .parsers
        .iter()
        .map(|parser| {
            let built = factory
                .get_parser(config, parser)
                .map(|built| built.kind().to_string());
            (parser.name.clone(), built)
        })
        .collect()
}

pub fn run_validate(args: ValidateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = RepositoryConfig::load(&args.config)?;
    let factory = EntryParserFactory::new();

    println!("Repository {} ({} parsers)", config.name.white().bold(), config.parsers.len());

    let mut failures = 0;
    for (name, outcome) in validate_config(&config, &factory) {
        match outcome {
            Ok(kind) => println!("  {} {} ({})", "✓".green(), name, kind.dimmed()),
            Err(e) => {
                failures += 1;
                println!("  {} {}: {}", "✗".red(), name, e);
            }
        }
    }

    if failures > 0 {
        return Err(format!("{} of {} parsers failed to build", failures, config.parsers.len()).into());
    }

    Repository::new(&config, &factory)?;
    println!("{}", "Configuration is valid".green());
    Ok(())
}
