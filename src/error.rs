use thiserror::Error;

/// Construction-time errors. A repository with any of these refuses to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required property '{property}' for {owner}")]
    MissingProperty { owner: String, property: String },

    #[error("Invalid value '{value}' for property '{property}' of {owner}: {reason}")]
    InvalidProperty {
        owner: String,
        property: String,
        value: String,
        reason: String,
    },

    #[error("Invalid position {position} for field '{field}': positions start at 1")]
    InvalidPosition { field: String, position: String },

    #[error("Capture group '{group}' does not exist for field '{field}' (pattern has {available} groups)")]
    InvalidGroup {
        field: String,
        group: String,
        available: usize,
    },

    #[error("Regex error for pattern '{pattern}': {error_message}")]
    InvalidPattern { pattern: String, error_message: String },

    #[error("Default value '{value}' of field '{field}' cannot be parsed: {error_message}")]
    InvalidDefault {
        field: String,
        value: String,
        error_message: String,
    },

    #[error("Invalid date format '{format}': {error_message}")]
    InvalidDateFormat { format: String, error_message: String },

    #[error("Invalid number format '{format}': {error_message}")]
    InvalidNumberFormat { format: String, error_message: String },

    #[error("Unsupported timezone '{0}'")]
    InvalidTimezone(String),

    #[error("Unsupported data type '{0}'")]
    UnsupportedDataType(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Parser '{0}' is not registered")]
    ParserNotFound(String),

    #[error("Failed to instantiate parser '{parser}': {error_message}")]
    InstantiationFailed { parser: String, error_message: String },

    #[error("Parser '{0}' uses a filtered mode but has neither a source nor a host filter")]
    MissingFilter(String),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to extract or convert a single field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldParseError {
    #[error("No value available")]
    MissingValue,

    #[error("Pattern '{pattern}' did not match")]
    NoMatch { pattern: String },

    #[error("Position {position} is out of range, line has {available} tokens")]
    PositionOutOfRange { position: usize, available: usize },

    #[error("Cannot parse '{input}' as {expected}")]
    InvalidNumber { input: String, expected: &'static str },

    #[error("Value {input} does not fit in {expected}")]
    NumberOutOfRange { input: String, expected: &'static str },

    #[error("Cannot parse '{input}' with date format '{format}'")]
    InvalidDate { input: String, format: String },

    #[error("JSON syntax error: {message}")]
    InvalidJson { message: String },
}

/// Reason an entry was skipped. Returned in place of a parsed entry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A required argument was blank. This is a caller bug, not bad data.
    #[error("Required argument '{argument}' is blank")]
    BlankArgument { argument: &'static str },

    #[error("Failed to parse timestamp '{input}', expected {expected_format}")]
    InvalidTimestamp {
        input: String,
        expected_format: &'static str,
    },

    #[error("Failed to parse field '{field}': {source}")]
    Field {
        field: String,
        #[source]
        source: FieldParseError,
    },

    #[error("JSON error: {message}")]
    Json { message: String },
}

impl ParseError {
    /// Short, stable name used to bucket skip reasons.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::BlankArgument { .. } => "BlankArgument",
            ParseError::InvalidTimestamp { .. } => "InvalidTimestamp",
            ParseError::Field { .. } => "Field",
            ParseError::Json { .. } => "Json",
        }
    }

    /// True for caller contract violations as opposed to data-quality problems.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, ParseError::BlankArgument { .. })
    }
}
