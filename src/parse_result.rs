use crate::error::FieldParseError;
use crate::models::ParsedEntry;

/// A field that was dropped under the `SkipField` policy.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFailure {
    pub field: String,
    pub error: FieldParseError,
}

/// Successful outcome of an entry parse
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub entry: ParsedEntry,
    /// Tolerated failures; always empty under `SkipFieldIgnoreError`.
    pub field_failures: Vec<FieldFailure>,
    /// Name of the repository parser that produced the entry.
    pub parser: String,
    pub processing_time_micros: Option<u64>,
}

impl ParseResult {
    pub fn new(entry: ParsedEntry, parser: impl Into<String>) -> Self {
        Self {
            entry,
            field_failures: Vec::new(),
            parser: parser.into(),
            processing_time_micros: None,
        }
    }

    pub fn with_field_failures(mut self, failures: Vec<FieldFailure>) -> Self {
        self.field_failures = failures;
        self
    }

    /// Set processing time for this parse result
    pub fn with_processing_time(mut self, processing_time_micros: u64) -> Self {
        self.processing_time_micros = Some(processing_time_micros);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.field_failures.is_empty()
    }

    pub fn into_entry(self) -> ParsedEntry {
        self.entry
    }
}
