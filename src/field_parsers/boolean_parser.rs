use super::preparse::{apply_preparse, PreParse};
use super::FieldParser;
use crate::capture::compile_full_match;
use crate::config::{keys, DataType, RepositoryFieldConfig};
use crate::error::{ConfigError, FieldParseError};
use crate::models::FieldValue;
use regex::Regex;

const DEFAULT_TRUE_PATTERN: &str = "(?i)true";

/// Never fails: text that does not match the true pattern is `false`.
#[derive(Debug, Clone)]
pub struct BooleanFieldParser {
    name: String,
    preparse: Option<PreParse>,
    true_pattern: Regex,
    default: Option<bool>,
}

impl BooleanFieldParser {
    pub fn new(field: &RepositoryFieldConfig) -> Result<Self, ConfigError> {
        let pattern = field
            .properties
            .get(keys::TRUE_PATTERN)
            .unwrap_or(DEFAULT_TRUE_PATTERN);

        Ok(Self {
            name: field.name.clone(),
            preparse: PreParse::from_field(field)?,
            true_pattern: compile_full_match(pattern)?,
            default: field
                .properties
                .get(keys::DEFAULT_VALUE)
                .map(|v| v.trim().eq_ignore_ascii_case("true")),
        })
    }
}

impl FieldParser for BooleanFieldParser {
    fn field_name(&self) -> &str {
        &self.name
    }

    fn data_type(&self) -> DataType {
        DataType::Boolean
    }

    fn parse(&self, raw: Option<&str>) -> Result<FieldValue, FieldParseError> {
        let value = match apply_preparse(self.preparse.as_ref(), raw) {
            Some(value) => self.true_pattern.is_match(value),
            None => self.default.unwrap_or(false),
        };
        Ok(FieldValue::Boolean(value))
    }
}
