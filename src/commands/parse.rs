use crate::cli::{OutputFormat, ParseArgs};
use crate::commands::output::OutputFormatter;
use crate::config::RepositoryConfig;
use crate::entry_parsers::{EntryParserFactory, TIMESTAMP_FORMAT};
use crate::models::RawEntry;
use crate::repository::Repository;
use crate::statistics::ParsingStatistics;
use chrono::Utc;
use colored::*;
use glob::glob;
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{stdout, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Transport metadata stamped on bare-message lines.
#[derive(Debug, Clone)]
pub struct RawStamp {
    pub source: String,
    pub host: String,
    pub severity: String,
}

/// One input line in envelope form. `severity` may be a code or a name and
/// `fields` either an object or its serialized text.
#[derive(Debug, Deserialize)]
struct Envelope {
    timestamp: String,
    source: String,
    host: String,
    #[serde(default)]
    severity: Value,
    #[serde(default)]
    fields: Option<Value>,
    message: String,
}

impl From<Envelope> for RawEntry {
    fn from(envelope: Envelope) -> Self {
        let severity = match envelope.severity {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        let fields = envelope.fields.and_then(|fields| match fields {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        });

        RawEntry {
            timestamp: envelope.timestamp,
            source: envelope.source,
            host: envelope.host,
            severity,
            fields,
            message: envelope.message,
        }
    }
}

/// Decode one input line: a JSON envelope, or a bare message when `stamp` is set.
pub fn decode_line(line: &str, stamp: Option<&RawStamp>) -> Result<RawEntry, serde_json::Error> {
    match stamp {
        Some(stamp) => Ok(RawEntry::new(
            Utc::now().format(TIMESTAMP_FORMAT).to_string(),
            stamp.source.clone(),
            stamp.host.clone(),
            stamp.severity.clone(),
            line,
        )),
        None => serde_json::from_str::<Envelope>(line).map(RawEntry::from),
    }
}

/// Decoded entries of every non-blank line in `files`. Lines that are not
/// valid envelopes are reported on stderr and left out.
pub fn read_entries(
    files: &[PathBuf],
    stamp: Option<&RawStamp>,
) -> Result<(Vec<RawEntry>, usize), Box<dyn std::error::Error>> {
    let mut entries = Vec::new();
    let mut malformed = 0;

    for file_path in files {
        for_each_line(file_path, |line_number, line| {
            match decode_line(line, stamp) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    malformed += 1;
                    report_malformed(file_path, line_number, &e);
                }
            }
            true
        })?;
    }

    Ok((entries, malformed))
}

/// Calls `f` with every non-blank line until it returns false.
fn for_each_line(
    path: &Path,
    mut f: impl FnMut(usize, &str) -> bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(path)?);
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if !f(index + 1, &line) {
            break;
        }
    }
    Ok(())
}

fn report_malformed(path: &Path, line_number: usize, error: &serde_json::Error) {
    eprintln!(
        "{} {}:{} not an entry envelope: {}",
        "malformed".red(),
        path.display(),
        line_number,
        error
    );
}

pub fn run_parse(args: ParseArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = RepositoryConfig::load(&args.config)?;
    let repository = Repository::new(&config, &EntryParserFactory::new())?;
    let formatter = OutputFormatter::new(args.format);

    let files = expand_globs(&args.files)?;
    if files.is_empty() {
        eprintln!("No files matched the given patterns");
        return Ok(());
    }

    let stamp = args.raw.then(|| RawStamp {
        source: args.source.clone(),
        host: args.host.clone(),
        severity: args.severity.clone(),
    });

    let mut output = stdout().lock();
    formatter.print_header(&mut output)?;

    let mut statistics = ParsingStatistics::new();
    let mut collected = Vec::new();
    let mut printed = 0;
    let mut io_error = None;

    for file_path in &files {
        for_each_line(file_path, |line_number, line| {
            let entry = match decode_line(line, stamp.as_ref()) {
                Ok(entry) => entry,
                Err(e) => {
                    report_malformed(file_path, line_number, &e);
                    return true;
                }
            };

            let started = Instant::now();
            let outcome = repository.parse(&entry);
            statistics.record(&outcome, started.elapsed().as_micros() as u64);

            match outcome {
                Ok(result) => {
                    if args.limit.is_some_and(|limit| printed >= limit) {
                        return true;
                    }
                    printed += 1;
                    if args.format == OutputFormat::Json {
                        collected.push(result.into_entry());
                    } else if let Err(e) = writeln!(output, "{}", formatter.format_entry(&result.entry)) {
                        io_error = Some(e);
                        return false;
                    }
                }
                Err(error) => eprintln!(
                    "{} {}:{} [{}] {}",
                    "skipped".yellow(),
                    file_path.display(),
                    line_number,
                    error.kind(),
                    error
                ),
            }
            true
        })?;

        if let Some(e) = io_error.take() {
            return Err(e.into());
        }
    }

    if args.format == OutputFormat::Json {
        writeln!(output, "{}", formatter.format_entries(&collected))?;
    }

    eprintln!("{}", statistics.generate_status_line().dimmed());
    Ok(())
}

pub fn expand_globs(patterns: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let pattern_str = pattern.to_string_lossy();
        if pattern_str.contains('*') || pattern_str.contains('?') {
            for entry in glob(&pattern_str)? {
                files.push(entry?);
            }
        } else {
            files.push(pattern.clone());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_envelope() {
        let line = r#"{"timestamp": "2024-01-01T00:00:00.000Z", "source": "app", "host": "h1", "severity": 3, "fields": {"user": "x"}, "message": "boom"}"#;
        let entry = decode_line(line, None).unwrap();
        assert_eq!(entry.severity, "3");
        assert_eq!(entry.fields.as_deref(), Some(r#"{"user":"x"}"#));
        assert_eq!(entry.message, "boom");

        let named = r#"{"timestamp": "t", "source": "s", "host": "h", "severity": "warning", "message": "m"}"#;
        let entry = decode_line(named, None).unwrap();
        assert_eq!(entry.severity, "warning");
        assert_eq!(entry.fields, None);
    }

    #[test]
    fn test_decode_raw_line() {
        let stamp = RawStamp {
            source: "nginx".into(),
            host: "web-1".into(),
            severity: "6".into(),
        };
        let entry = decode_line("GET / 200", Some(&stamp)).unwrap();
        assert_eq!(entry.source, "nginx");
        assert_eq!(entry.message, "GET / 200");
        assert!(entry.timestamp.ends_with('Z'));
        assert!(decode_line("GET / 200", None).is_err());
    }

    #[test]
    fn test_expand_plain_paths() {
        let files = expand_globs(&[PathBuf::from("a.log"), PathBuf::from("b.log")]).unwrap();
        assert_eq!(files, vec![PathBuf::from("a.log"), PathBuf::from("b.log")]);
    }
}
