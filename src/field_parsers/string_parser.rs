use super::preparse::{apply_preparse, PreParse};
use super::FieldParser;
use crate::config::{keys, DataType, RepositoryFieldConfig};
use crate::error::{ConfigError, FieldParseError};
use crate::models::FieldValue;

#[derive(Debug, Clone)]
pub struct StringFieldParser {
    name: String,
    preparse: Option<PreParse>,
    default: Option<String>,
}

impl StringFieldParser {
    pub fn new(field: &RepositoryFieldConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            name: field.name.clone(),
            preparse: PreParse::from_field(field)?,
            default: field.properties.get(keys::DEFAULT_VALUE).map(str::to_string),
        })
    }
}

impl FieldParser for StringFieldParser {
    fn field_name(&self) -> &str {
        &self.name
    }

    fn data_type(&self) -> DataType {
        DataType::String
    }

    fn parse(&self, raw: Option<&str>) -> Result<FieldValue, FieldParseError> {
        match (apply_preparse(self.preparse.as_ref(), raw), &self.default) {
            (Some(value), Some(default)) if value.trim().is_empty() => {
                Ok(FieldValue::String(default.clone()))
            }
            (Some(value), _) => Ok(FieldValue::String(value.to_string())),
            (None, Some(default)) => Ok(FieldValue::String(default.clone())),
            (None, None) => Err(FieldParseError::MissingValue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(properties: &[(&str, &str)]) -> StringFieldParser {
        let field = properties
            .iter()
            .fold(RepositoryFieldConfig::new("s", DataType::String), |f, (k, v)| {
                f.with_property(*k, *v)
            });
        StringFieldParser::new(&field).unwrap()
    }

    #[test]
    fn test_value_returned_as_is() {
        let p = parser(&[]);
        assert_eq!(p.parse(Some(" padded ")).unwrap(), FieldValue::String(" padded ".into()));
        assert_eq!(p.parse(Some("")).unwrap(), FieldValue::String(String::new()));
        assert_eq!(p.parse(None), Err(FieldParseError::MissingValue));
    }

    #[test]
    fn test_blank_value_uses_default() {
        let p = parser(&[(keys::DEFAULT_VALUE, "n/a")]);
        assert_eq!(p.parse(Some("  ")).unwrap(), FieldValue::String("n/a".into()));
        assert_eq!(p.parse(None).unwrap(), FieldValue::String("n/a".into()));
        assert_eq!(p.parse(Some("x")).unwrap(), FieldValue::String("x".into()));
    }

    #[test]
    fn test_preparse_runs_first() {
        let p = parser(&[(keys::PREPARSE_PATTERN, r"user=(\w+)")]);
        assert_eq!(
            p.parse(Some("login user=bob ok")).unwrap(),
            FieldValue::String("bob".into())
        );
    }
}
