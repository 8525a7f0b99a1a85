//! Integer, long and double fields share one parser, parameterized by kind.

use super::preparse::{apply_preparse, PreParse};
use super::FieldParser;
use crate::config::{keys, DataType, RepositoryFieldConfig};
use crate::error::{ConfigError, FieldParseError};
use crate::models::FieldValue;
use crate::number_format::{Number, NumberFormat};
use std::fmt;
use std::marker::PhantomData;
use std::num::IntErrorKind;

/// Target numeric type of a [`NumericFieldParser`].
pub trait NumericKind: fmt::Debug + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    /// Plain base-10 conversion.
    fn from_plain(text: &str) -> Result<FieldValue, FieldParseError>;

    /// Conversion of a pattern-parsed number; integral kinds truncate.
    fn from_number(number: Number, text: &str) -> Result<FieldValue, FieldParseError>;
}

#[derive(Debug, Clone, Copy)]
pub struct IntegerKind;

#[derive(Debug, Clone, Copy)]
pub struct LongKind;

#[derive(Debug, Clone, Copy)]
pub struct DoubleKind;

fn invalid(text: &str, expected: &'static str) -> FieldParseError {
    FieldParseError::InvalidNumber {
        input: text.to_string(),
        expected,
    }
}

fn out_of_range(text: &str, expected: &'static str) -> FieldParseError {
    FieldParseError::NumberOutOfRange {
        input: text.to_string(),
        expected,
    }
}

fn parse_i64(text: &str, expected: &'static str) -> Result<i64, FieldParseError> {
    text.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => out_of_range(text, expected),
        _ => invalid(text, expected),
    })
}

/// Truncate toward zero, `None` when the result is outside `[min, max]`.
fn truncate(value: f64, min: f64, max_exclusive: f64) -> Option<f64> {
    let truncated = value.trunc();
    (truncated.is_finite() && truncated >= min && truncated < max_exclusive).then_some(truncated)
}

impl NumericKind for IntegerKind {
    const DATA_TYPE: DataType = DataType::Integer;

    fn from_plain(text: &str) -> Result<FieldValue, FieldParseError> {
        let wide = parse_i64(text, "integer")?;
        i32::try_from(wide)
            .map(FieldValue::Integer)
            .map_err(|_| out_of_range(text, "integer"))
    }

    fn from_number(number: Number, text: &str) -> Result<FieldValue, FieldParseError> {
        match number {
            Number::Long(l) => i32::try_from(l)
                .map(FieldValue::Integer)
                .map_err(|_| out_of_range(text, "integer")),
            Number::Double(d) => truncate(d, i32::MIN as f64, i32::MAX as f64 + 1.0)
                .map(|t| FieldValue::Integer(t as i32))
                .ok_or_else(|| out_of_range(text, "integer")),
        }
    }
}

impl NumericKind for LongKind {
    const DATA_TYPE: DataType = DataType::Long;

    fn from_plain(text: &str) -> Result<FieldValue, FieldParseError> {
        parse_i64(text, "long").map(FieldValue::Long)
    }

    fn from_number(number: Number, text: &str) -> Result<FieldValue, FieldParseError> {
        match number {
            Number::Long(l) => Ok(FieldValue::Long(l)),
            Number::Double(d) => truncate(d, i64::MIN as f64, -(i64::MIN as f64))
                .map(|t| FieldValue::Long(t as i64))
                .ok_or_else(|| out_of_range(text, "long")),
        }
    }
}

impl NumericKind for DoubleKind {
    const DATA_TYPE: DataType = DataType::Double;

    fn from_plain(text: &str) -> Result<FieldValue, FieldParseError> {
        text.parse::<f64>()
            .map(FieldValue::Double)
            .map_err(|_| invalid(text, "double"))
    }

    fn from_number(number: Number, _text: &str) -> Result<FieldValue, FieldParseError> {
        Ok(FieldValue::Double(number.as_f64()))
    }
}

#[derive(Debug, Clone)]
pub struct NumericFieldParser<K: NumericKind> {
    name: String,
    preparse: Option<PreParse>,
    number_format: Option<NumberFormat>,
    default: Option<FieldValue>,
    kind: PhantomData<fn() -> K>,
}

pub type IntegerFieldParser = NumericFieldParser<IntegerKind>;
pub type LongFieldParser = NumericFieldParser<LongKind>;
pub type DoubleFieldParser = NumericFieldParser<DoubleKind>;

impl<K: NumericKind> NumericFieldParser<K> {
    pub fn new(field: &RepositoryFieldConfig) -> Result<Self, ConfigError> {
        let number_format = field
            .properties
            .get(keys::NUMBER_FORMAT)
            .map(NumberFormat::new)
            .transpose()?;

        let mut parser = Self {
            name: field.name.clone(),
            preparse: PreParse::from_field(field)?,
            number_format,
            default: None,
            kind: PhantomData,
        };

        if let Some(default) = field.properties.get(keys::DEFAULT_VALUE) {
            let value = parser
                .convert(default.trim())
                .map_err(|e| ConfigError::InvalidDefault {
                    field: field.name.clone(),
                    value: default.to_string(),
                    error_message: e.to_string(),
                })?;
            parser.default = Some(value);
        }

        Ok(parser)
    }

    fn convert(&self, text: &str) -> Result<FieldValue, FieldParseError> {
        match &self.number_format {
            Some(format) => {
                let number = format.parse(text)?;
                K::from_number(number, text)
            }
            None => K::from_plain(text),
        }
    }
}

impl<K: NumericKind> FieldParser for NumericFieldParser<K> {
    fn field_name(&self) -> &str {
        &self.name
    }

    fn data_type(&self) -> DataType {
        K::DATA_TYPE
    }

    fn parse(&self, raw: Option<&str>) -> Result<FieldValue, FieldParseError> {
        let converted = match apply_preparse(self.preparse.as_ref(), raw) {
            Some(value) => self.convert(value.trim()),
            None => Err(FieldParseError::MissingValue),
        };
        converted.or_else(|error| self.default.clone().ok_or(error))
    }
}
