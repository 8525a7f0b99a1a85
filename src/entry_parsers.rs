//! Entry parsing strategies.
//!
//! Every strategy owns an [`EntryParserCore`] holding what they all share:
//! applicability filters, the keyword budget, the field error policy and the
//! tokenizer. A strategy only decides how raw field values are located in the
//! message.

use crate::error::ParseError;
use crate::models::RawEntry;
use crate::parse_result::ParseResult;

/// Turns one raw entry into a structured one, or explains why it was skipped.
///
/// An `Err` is a terminal decision for that input: the entry must not be
/// stored and retrying it will produce the same result.
pub trait EntryParser: Send {
    fn core(&self) -> &EntryParserCore;

    fn parse(&self, entry: &RawEntry) -> Result<ParseResult, ParseError>;

    fn name(&self) -> &str {
        self.core().name()
    }

    /// Implementation identifier, e.g. `delimited` or a registered extension id.
    fn kind(&self) -> &str {
        self.core().kind()
    }

    fn is_applicable(&self, source: &str, host: &str) -> bool {
        self.core().is_applicable(source, host)
    }
}

pub mod base;
pub mod default_parser;
pub mod delimited_parser;
pub mod factory;
pub mod json_parser;
pub mod regex_parser;

pub use base::{Applicability, EntryDraft, EntryParserCore, Filter, TIMESTAMP_FORMAT};
pub use default_parser::DefaultEntryParser;
pub use delimited_parser::DelimitedEntryParser;
pub use factory::{EntryParserFactory, ParserConstructor, ParserKind};
pub use json_parser::JsonEntryParser;
pub use regex_parser::RegexEntryParser;
