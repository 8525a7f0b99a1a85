use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "logrepo")]
#[command(author, version, about = "Per-repository log entry parsing with typed fields and keyword indexing")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log parser decisions (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse log files through a repository configuration
    Parse(ParseArgs),

    /// Build every parser of a repository configuration and report errors
    Validate(ValidateArgs),

    /// Run files through the ingest pool and print statistics
    Stats(StatsArgs),
}

#[derive(Args)]
pub struct ParseArgs {
    /// Repository configuration (JSON)
    #[arg(long, short)]
    pub config: PathBuf,

    /// Log files to parse (supports glob patterns)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Treat every line as a bare message instead of a JSON envelope
    #[arg(long)]
    pub raw: bool,

    /// Source stamped on raw lines
    #[arg(long, default_value = "cli")]
    pub source: String,

    /// Host stamped on raw lines
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Severity stamped on raw lines (code or name)
    #[arg(long, default_value = "6")]
    pub severity: String,

    /// Output format
    #[arg(long, short, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Maximum number of parsed entries to print
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Repository configuration (JSON)
    #[arg(long, short)]
    pub config: PathBuf,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Repository configuration (JSON)
    #[arg(long, short)]
    pub config: PathBuf,

    /// Log files to analyze (JSON envelopes, supports glob patterns)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Number of workers (0 = auto-detect)
    #[arg(long, short = 'j', default_value = "0")]
    pub parallel: usize,

    /// Treat every line as a bare message instead of a JSON envelope
    #[arg(long)]
    pub raw: bool,

    /// Print the statistics as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// Pretty-printed JSON array
    Json,
    /// Newline-delimited JSON
    Ndjson,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Ndjson => write!(f, "ndjson"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let cli = Cli::try_parse_from([
            "logrepo", "parse", "--config", "repo.json", "--raw", "--source", "nginx", "-f", "json",
            "a.log", "b.log",
        ])
        .unwrap();
        let Commands::Parse(args) = cli.command else {
            panic!("expected parse");
        };
        assert!(args.raw);
        assert_eq!(args.source, "nginx");
        assert_eq!(args.host, "localhost");
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.files.len(), 2);
    }

    #[test]
    fn test_stats_and_global_verbose() {
        let cli = Cli::try_parse_from(["logrepo", "stats", "-c", "r.json", "-j", "4", "x.log", "-v"]).unwrap();
        assert!(cli.verbose);
        let Commands::Stats(args) = cli.command else {
            panic!("expected stats");
        };
        assert_eq!(args.parallel, 4);
    }

    #[test]
    fn test_files_are_required() {
        assert!(Cli::try_parse_from(["logrepo", "parse", "--config", "r.json"]).is_err());
        assert!(Cli::try_parse_from(["logrepo", "validate", "--config", "r.json"]).is_ok());
    }
}
