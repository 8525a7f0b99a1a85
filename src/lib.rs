//! Per-repository log entry parsing.
//!
//! A [`Repository`] owns an ordered list of entry parsers built from a
//! [`RepositoryConfig`]. Each raw entry is routed to the first parser whose
//! source/host filters accept it; the parser normalizes the envelope,
//! extracts typed fields and derives search keywords, or rejects the entry
//! with a [`ParseError`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod date_format;
pub mod entry_parsers;
pub mod error;
pub mod field_parsers;
pub mod ingest_pool;
pub mod keywords;
pub mod models;
pub mod number_format;
pub mod parse_result;
pub mod repository;
pub mod statistics;

mod capture;


pub use config::{
    ApplicabilityMode, DataType, ErrorPolicy, Properties, RepositoryConfig, RepositoryFieldConfig,
    RepositoryParserConfig, DEFAULT_MAX_KEYWORDS,
};
pub use entry_parsers::{
    DefaultEntryParser, DelimitedEntryParser, EntryParser, EntryParserCore, EntryParserFactory,
    JsonEntryParser, ParserKind, RegexEntryParser,
};
pub use error::{ConfigError, FieldParseError, ParseError};
pub use field_parsers::{FieldParser, FieldParserFactory};
pub use ingest_pool::{IngestConfig, IngestOutcome, IngestPool, IngestReport};
pub use keywords::{Tokenizer, WordTokenizer};
pub use models::{FieldValue, ParsedEntry, RawEntry, Severity};
pub use parse_result::{FieldFailure, ParseResult};
pub use repository::Repository;
pub use statistics::ParsingStatistics;
