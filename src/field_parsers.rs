//! Per-field converters. Each parser is bound to one field configuration for
//! its whole life and turns the raw text located by an entry parser into a
//! typed [`FieldValue`].

use crate::config::DataType;
use crate::error::FieldParseError;
use crate::models::FieldValue;
use std::fmt;

/// Converts one raw field value. Parsers hold no per-call state, so a single
/// instance may be shared freely.
pub trait FieldParser: Send + Sync + fmt::Debug {
    fn field_name(&self) -> &str;

    fn data_type(&self) -> DataType;

    /// `None` means the entry parser found no value for this field.
    fn parse(&self, raw: Option<&str>) -> Result<FieldValue, FieldParseError>;
}

pub mod boolean_parser;
pub mod date_parser;
pub mod factory;
pub mod numeric_parser;
pub mod preparse;
pub mod string_parser;

pub use boolean_parser::BooleanFieldParser;
pub use date_parser::DateFieldParser;
pub use factory::FieldParserFactory;
pub use numeric_parser::{DoubleFieldParser, IntegerFieldParser, LongFieldParser, NumericFieldParser};
pub use preparse::PreParse;
pub use string_parser::StringFieldParser;
