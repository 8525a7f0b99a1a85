use crate::cli::OutputFormat;
use crate::models::{ParsedEntry, Severity};
use crate::statistics::ParsingStatistics;
use chrono::SecondsFormat;
use colored::*;
use std::io::{self, Write};

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_entry(&self, entry: &ParsedEntry) -> String {
        match self.format {
            OutputFormat::Table => self.format_table(entry),
            OutputFormat::Json | OutputFormat::Ndjson => serde_json::to_string(entry).unwrap_or_default(),
        }
    }

    pub fn format_entries(&self, entries: &[ParsedEntry]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(entries).unwrap_or_default(),
            _ => entries
                .iter()
                .map(|e| self.format_entry(e))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn print_header(&self, writer: &mut impl Write) -> io::Result<()> {
        if self.format == OutputFormat::Table {
            writeln!(writer, "{}", "─".repeat(100).dimmed())?;
        }
        Ok(())
    }

    fn format_table(&self, entry: &ParsedEntry) -> String {
        let mut output = String::new();

        let ts = entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        output.push_str(&format!("{} ", ts.cyan()));

        let name = entry.severity.name();
        let colored_severity = match entry.severity {
            Severity::Emergency | Severity::Action | Severity::Critical => name.red().bold(),
            Severity::Error => name.red(),
            Severity::Warning => name.yellow(),
            Severity::Notice | Severity::Information => name.green(),
            Severity::Debug => name.blue(),
        };
        output.push_str(&format!("[{:^11}] ", colored_severity));
        output.push_str(&format!("{}@{} ", entry.source.white(), entry.host.dimmed()));
        output.push_str(&entry.message);

        if !entry.fields.is_empty() {
            let fields: Vec<String> = entry
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k.dimmed(), v))
                .collect();
            output.push_str(&format!(" {}", fields.join(" ").dimmed()));
        }

        output
    }
}

pub fn print_stats_summary(statistics: &ParsingStatistics, malformed: usize) {
    let total = statistics.total_entries;
    println!("\n{}", "═".repeat(50).cyan());
    println!("{}", "SUMMARY".cyan().bold());
    println!("{}", "═".repeat(50).cyan());
    println!("Total entries:    {}", total.to_string().white().bold());
    println!(
        "Stored:           {} ({:.1}%)",
        statistics.stored_entries.to_string().green(),
        statistics.store_rate()
    );
    println!(
        "Skipped:          {} ({:.1}%)",
        statistics.skipped_entries.to_string().yellow(),
        statistics.skip_rate()
    );
    if malformed > 0 {
        println!("Malformed lines:  {}", malformed.to_string().red());
    }

    if !statistics.parser_distribution.is_empty() {
        println!("\n{}:", "Parser Distribution".cyan().bold());
        for (parser, count) in &statistics.parser_distribution {
            let share = *count as f64 / total.max(1) as f64;
            let bar = "█".repeat((share * 40.0) as usize);
            println!("  {:20} {:>6} ({:5.1}%) {}", parser, count, share * 100.0, bar.green());
        }
    }

    if !statistics.skip_reasons.is_empty() {
        println!("\n{}:", "Skip Reasons".cyan().bold());
        for (reason, count) in &statistics.skip_reasons {
            println!("  {:20} {:>6}", reason, count.to_string().yellow());
        }
    }
}
