use clap::Parser;
use logrepo::cli::{Cli, Commands};
use logrepo::commands::{run_parse, run_stats, run_validate};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "logrepo=debug" } else { "logrepo=info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Parse(args) => run_parse(args),
        Commands::Validate(args) => run_validate(args),
        Commands::Stats(args) => run_stats(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
