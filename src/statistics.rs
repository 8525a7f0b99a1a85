use crate::error::ParseError;
use crate::parse_result::ParseResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ingestion statistics for monitoring and debugging
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsingStatistics {
    /// Total number of entries handed to a repository
    pub total_entries: usize,
    /// Entries that produced a storable result
    pub stored_entries: usize,
    /// Entries rejected by their parser
    pub skipped_entries: usize,
    /// Skips caused by blank required arguments
    pub contract_violations: usize,
    /// Field failures tolerated under the skip-field policy
    pub tolerated_field_failures: usize,
    /// Stored entries per parser name
    pub parser_distribution: BTreeMap<String, usize>,
    /// Skipped entries per `ParseError::kind`
    pub skip_reasons: BTreeMap<String, usize>,
    /// Processing time statistics (in microseconds)
    pub processing_time_micros: ProcessingTimeStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingTimeStats {
    pub total_time: u64,
    /// `None` until the first sample.
    pub min_time: Option<u64>,
    pub max_time: u64,
    pub avg_time: f64,
}

impl ParsingStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_stored(&mut self, result: &ParseResult) {
        self.total_entries += 1;
        self.stored_entries += 1;
        self.tolerated_field_failures += result.field_failures.len();
        *self.parser_distribution.entry(result.parser.clone()).or_insert(0) += 1;
        self.update_processing_time(result.processing_time_micros.unwrap_or(0));
    }

    pub fn record_skipped(&mut self, error: &ParseError, processing_time_micros: u64) {
        self.total_entries += 1;
        self.skipped_entries += 1;
        if error.is_contract_violation() {
            self.contract_violations += 1;
        }
        *self.skip_reasons.entry(error.kind().to_string()).or_insert(0) += 1;
        self.update_processing_time(processing_time_micros);
    }

    pub fn record(&mut self, outcome: &Result<ParseResult, ParseError>, processing_time_micros: u64) {
        match outcome {
            Ok(result) => self.record_stored(result),
            Err(error) => self.record_skipped(error, processing_time_micros),
        }
    }

    /// Get store rate as a percentage
    pub fn store_rate(&self) -> f64 {
        percentage(self.stored_entries, self.total_entries)
    }

    /// Get skip rate as a percentage
    pub fn skip_rate(&self) -> f64 {
        percentage(self.skipped_entries, self.total_entries)
    }

    /// Fold another worker's statistics into these.
    pub fn merge(&mut self, other: &ParsingStatistics) {
        self.total_entries += other.total_entries;
        self.stored_entries += other.stored_entries;
        self.skipped_entries += other.skipped_entries;
        self.contract_violations += other.contract_violations;
        self.tolerated_field_failures += other.tolerated_field_failures;

        for (parser, count) in &other.parser_distribution {
            *self.parser_distribution.entry(parser.clone()).or_insert(0) += count;
        }
        for (reason, count) in &other.skip_reasons {
            *self.skip_reasons.entry(reason.clone()).or_insert(0) += count;
        }

        let ours = &mut self.processing_time_micros;
        let theirs = &other.processing_time_micros;
        ours.min_time = match (ours.min_time, theirs.min_time) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        ours.max_time = ours.max_time.max(theirs.max_time);
        ours.total_time = ours.total_time.saturating_add(theirs.total_time);
        ours.avg_time = if self.total_entries == 0 {
            0.0
        } else {
            ours.total_time as f64 / self.total_entries as f64
        };
    }

    fn update_processing_time(&mut self, time_micros: u64) {
        let times = &mut self.processing_time_micros;
        times.total_time = times.total_time.saturating_add(time_micros);

        times.min_time = Some(times.min_time.map_or(time_micros, |min| min.min(time_micros)));

        if time_micros > times.max_time {
            times.max_time = time_micros;
        }

        times.avg_time = times.total_time as f64 / self.total_entries as f64;
    }

    /// Generate a comprehensive report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Ingestion Statistics Report ===\n");
        report.push_str(&format!("Total entries processed: {}\n", self.total_entries));
        report.push_str(&format!(
            "Stored entries: {} ({:.2}%)\n",
            self.stored_entries,
            self.store_rate()
        ));
        report.push_str(&format!(
            "Skipped entries: {} ({:.2}%)\n",
            self.skipped_entries,
            self.skip_rate()
        ));
        report.push_str(&format!("Contract violations: {}\n", self.contract_violations));
        report.push_str(&format!(
            "Tolerated field failures: {}\n",
            self.tolerated_field_failures
        ));

        report.push_str("\n--- Parser Distribution ---\n");
        for (parser, count) in &self.parser_distribution {
            report.push_str(&format!(
                "{}: {} ({:.2}%)\n",
                parser,
                count,
                percentage(*count, self.stored_entries)
            ));
        }

        report.push_str("\n--- Skip Reasons ---\n");
        for (reason, count) in &self.skip_reasons {
            report.push_str(&format!(
                "{}: {} ({:.2}%)\n",
                reason,
                count,
                percentage(*count, self.skipped_entries)
            ));
        }

        let times = &self.processing_time_micros;
        report.push_str("\n--- Performance Metrics ---\n");
        report.push_str(&format!("Total processing time: {}μs\n", times.total_time));
        report.push_str(&format!("Average processing time: {:.2}μs\n", times.avg_time));
        report.push_str(&format!("Min processing time: {}μs\n", times.min_time.unwrap_or(0)));
        report.push_str(&format!("Max processing time: {}μs\n", times.max_time));

        if self.total_entries > 0 && times.total_time > 0 {
            let throughput = self.total_entries as f64 / (times.total_time as f64 / 1_000_000.0);
            report.push_str(&format!("Throughput: {:.2} entries/second\n", throughput));
        }

        report
    }

    /// Generate a compact status line for continuous monitoring
    pub fn generate_status_line(&self) -> String {
        format!(
            "Entries: {} | Stored: {:.1}% | Skipped: {:.1}% | Field failures: {} | Avg Time: {:.1}μs",
            self.total_entries,
            self.store_rate(),
            self.skip_rate(),
            self.tolerated_field_failures,
            self.processing_time_micros.avg_time
        )
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}
