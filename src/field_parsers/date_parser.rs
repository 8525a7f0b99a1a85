use super::preparse::{apply_preparse, PreParse};
use super::FieldParser;
use crate::config::{keys, DataType, RepositoryFieldConfig};
use crate::date_format::{DateFormat, DEFAULT_DATE_FORMAT};
use crate::error::{ConfigError, FieldParseError};
use crate::models::FieldValue;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct DateFieldParser {
    name: String,
    preparse: Option<PreParse>,
    format: DateFormat,
    default: Option<DateTime<Utc>>,
}

impl DateFieldParser {
    pub fn new(field: &RepositoryFieldConfig) -> Result<Self, ConfigError> {
        let properties = &field.properties;
        let format = DateFormat::new(
            properties.get(keys::DATE_FORMAT).unwrap_or(DEFAULT_DATE_FORMAT),
            properties.get(keys::DATE_TIMEZONE),
        )?;

        let default = match properties.get(keys::DEFAULT_VALUE) {
            Some(value) => Some(format.parse(value).map_err(|e| ConfigError::InvalidDefault {
                field: field.name.clone(),
                value: value.to_string(),
                error_message: e.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            name: field.name.clone(),
            preparse: PreParse::from_field(field)?,
            format,
            default,
        })
    }
}

impl FieldParser for DateFieldParser {
    fn field_name(&self) -> &str {
        &self.name
    }

    fn data_type(&self) -> DataType {
        DataType::Date
    }

    fn parse(&self, raw: Option<&str>) -> Result<FieldValue, FieldParseError> {
        let parsed = match apply_preparse(self.preparse.as_ref(), raw) {
            Some(value) => self.format.parse(value),
            None => Err(FieldParseError::MissingValue),
        };
        parsed
            .or_else(|error| self.default.ok_or(error))
            .map(FieldValue::Date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(properties: &[(&str, &str)]) -> DateFieldParser {
        let field = properties
            .iter()
            .fold(RepositoryFieldConfig::new("d", DataType::Date), |f, (k, v)| {
                f.with_property(*k, *v)
            });
        DateFieldParser::new(&field).unwrap()
    }

    fn utc(rfc3339: &str) -> FieldValue {
        FieldValue::Date(DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc))
    }

    #[test]
    fn test_default_format_with_trailing_z() {
        let p = parser(&[]);
        assert_eq!(p.parse(Some("2024-06-01T12:00:00Z")).unwrap(), utc("2024-06-01T12:00:00Z"));
        assert_eq!(
            p.parse(Some("2024-06-01T12:00:00-0100")).unwrap(),
            utc("2024-06-01T13:00:00Z")
        );
        assert!(matches!(
            p.parse(Some("June 1st")),
            Err(FieldParseError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_custom_format_and_timezone() {
        let p = parser(&[
            (keys::DATE_FORMAT, "dd.MM.yyyy HH:mm"),
            (keys::DATE_TIMEZONE, "+02:00"),
        ]);
        assert_eq!(p.parse(Some("01.06.2024 12:00")).unwrap(), utc("2024-06-01T10:00:00Z"));
    }

    #[test]
    fn test_default_on_failure() {
        let p = parser(&[
            (keys::DATE_FORMAT, "yyyy-MM-dd"),
            (keys::DEFAULT_VALUE, "1970-01-01"),
        ]);
        assert_eq!(p.parse(Some("garbage")).unwrap(), utc("1970-01-01T00:00:00Z"));
        assert_eq!(p.parse(None).unwrap(), utc("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn test_invalid_configuration() {
        let bad_default = RepositoryFieldConfig::new("d", DataType::Date)
            .with_property(keys::DEFAULT_VALUE, "yesterday");
        assert!(matches!(
            DateFieldParser::new(&bad_default),
            Err(ConfigError::InvalidDefault { .. })
        ));

        let bad_format = RepositoryFieldConfig::new("d", DataType::Date)
            .with_property(keys::DATE_FORMAT, "yyyy-QQ");
        assert!(matches!(
            DateFieldParser::new(&bad_format),
            Err(ConfigError::InvalidDateFormat { .. })
        ));
    }
}
