use super::base::{json_type_name, EntryParserCore};
use super::factory::ParserKind;
use super::EntryParser;
use crate::capture::compile_full_match;
use crate::config::{keys, RepositoryConfig, RepositoryParserConfig};
use crate::date_format::{DateFormat, DEFAULT_DATE_FORMAT};
use crate::error::{ConfigError, ParseError};
use crate::keywords::Tokenizer;
use crate::models::{FieldValue, RawEntry};
use crate::parse_result::ParseResult;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

/// Takes every key of a JSON object message as a field.
///
/// String leaves can be promoted: values matching `date_pattern` are parsed
/// with `date_format`, values matching `long_suffix` (e.g. `NumberLong\((-?\d+)\)`)
/// become longs. The date check runs first.
#[derive(Debug)]
pub struct JsonEntryParser {
    core: EntryParserCore,
    date_pattern: Option<Regex>,
    date_format: DateFormat,
    long_suffix: Option<Regex>,
}

impl JsonEntryParser {
    pub fn new(
        repository: &RepositoryConfig,
        parser: &RepositoryParserConfig,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self, ConfigError> {
        let properties = &parser.properties;
        let date_pattern = properties
            .get(keys::DATE_PATTERN)
            .map(compile_full_match)
            .transpose()?;
        let long_suffix = properties
            .get(keys::LONG_SUFFIX)
            .map(compile_full_match)
            .transpose()?;
        let date_format = DateFormat::new(
            properties.get(keys::DATE_FORMAT).unwrap_or(DEFAULT_DATE_FORMAT),
            properties.get(keys::DATE_TIMEZONE),
        )?;

        Ok(Self {
            core: EntryParserCore::new(repository, parser, ParserKind::Json.id(), tokenizer)?,
            date_pattern,
            date_format,
            long_suffix,
        })
    }

    fn convert(&self, value: &Value) -> FieldValue {
        match value {
            Value::String(text) => self.convert_string(text),
            Value::Array(items) => FieldValue::Array(items.iter().map(|v| self.convert(v)).collect()),
            Value::Object(map) => FieldValue::Object(
                map.iter()
                    .map(|(key, v)| (key.clone(), self.convert(v)))
                    .collect(),
            ),
            scalar => FieldValue::from_json(scalar),
        }
    }

    fn convert_string(&self, text: &str) -> FieldValue {
        if self.date_pattern.as_ref().is_some_and(|re| re.is_match(text)) {
            if let Ok(date) = self.date_format.parse(text) {
                return FieldValue::Date(date);
            }
        }

        if let Some(regex) = &self.long_suffix {
            if let Some(captures) = regex.captures(text) {
                let digits = captures
                    .get(1)
                    .map(|m| m.as_str())
                    .or_else(|| leading_integer(text));
                if let Some(long) = digits.and_then(|d| d.parse::<i64>().ok()) {
                    return FieldValue::Long(long);
                }
            }
        }

        FieldValue::String(text.to_string())
    }
}

/// First signed run of ASCII digits in `text`.
fn leading_integer(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let start = if text[..start].ends_with('-') { start - 1 } else { start };
    let len = text[start..]
        .char_indices()
        .skip(1)
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(text.len() - start, |(i, _)| i);
    Some(&text[start..start + len])
}

impl EntryParser for JsonEntryParser {
    fn core(&self) -> &EntryParserCore {
        &self.core
    }

    fn parse(&self, entry: &RawEntry) -> Result<ParseResult, ParseError> {
        let mut draft = self.core.prepare(entry)?;

        match serde_json::from_str::<Value>(&entry.message) {
            Ok(Value::Object(map)) => {
                for (key, value) in &map {
                    draft.fields.insert(key.clone(), self.convert(value));
                }
            }
            Ok(other) => self.core.on_json_error(format!(
                "message must be a JSON object, found {}",
                json_type_name(&other)
            ))?,
            Err(e) => self.core.on_json_error(e.to_string())?,
        }

        Ok(self.core.finish(entry, draft))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ErrorPolicy;
    use crate::keywords::WordTokenizer;
    use chrono::{DateTime, Utc};

    fn build(parser: RepositoryParserConfig) -> JsonEntryParser {
        JsonEntryParser::new(&RepositoryConfig::new("repo"), &parser, Arc::new(WordTokenizer)).unwrap()
    }

    fn raw(message: &str) -> RawEntry {
        RawEntry::new("2024-01-01T00:00:00.000Z", "app", "host", "6", message)
    }

    #[test]
    fn test_plain_json_fields() {
        let parser = build(RepositoryParserConfig::new("p", "json"));
        let result = parser
            .parse(&raw(r#"{"user": "dave", "status": 200, "elapsed": 0.5, "ok": true, "tags": ["a", "b"]}"#))
            .unwrap();
        let fields = &result.entry.fields;
        assert_eq!(fields["user"], FieldValue::String("dave".into()));
        assert_eq!(fields["status"], FieldValue::Integer(200));
        assert_eq!(fields["elapsed"], FieldValue::Double(0.5));
        assert_eq!(fields["ok"], FieldValue::Boolean(true));
        assert_eq!(
            fields["tags"],
            FieldValue::Array(vec![FieldValue::String("a".into()), FieldValue::String("b".into())])
        );
    }

    #[test]
    fn test_date_and_long_heuristics() {
        let parser = build(
            RepositoryParserConfig::new("p", "json")
                .with_property(keys::DATE_PATTERN, r"\d{4}-\d{2}-\d{2}T.*")
                .with_property(keys::LONG_SUFFIX, r"NumberLong\((-?\d+)\)"),
        );
        let result = parser
            .parse(&raw(
                r#"{"at": "2024-02-03T04:05:06Z", "count": "NumberLong(-42)", "nested": {"id": "NumberLong(7)"}, "note": "2024 later"}"#,
            ))
            .unwrap();
        let fields = &result.entry.fields;

        let expected: DateTime<Utc> = DateTime::parse_from_rfc3339("2024-02-03T04:05:06Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(fields["at"], FieldValue::Date(expected));
        assert_eq!(fields["count"], FieldValue::Long(-42));
        let FieldValue::Object(nested) = &fields["nested"] else {
            panic!("expected object");
        };
        assert_eq!(nested["id"], FieldValue::Long(7));
        assert_eq!(fields["note"], FieldValue::String("2024 later".into()));
    }

    #[test]
    fn test_date_wins_over_long() {
        let parser = build(
            RepositoryParserConfig::new("p", "json")
                .with_property(keys::DATE_PATTERN, r"\d{8}")
                .with_property(keys::DATE_FORMAT, "yyyyMMdd")
                .with_property(keys::LONG_SUFFIX, r"\d+"),
        );
        let result = parser.parse(&raw(r#"{"day": "20240203", "n": "123"}"#)).unwrap();
        assert!(matches!(result.entry.fields["day"], FieldValue::Date(_)));
        assert_eq!(result.entry.fields["n"], FieldValue::Long(123));
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("123L"), Some("123"));
        assert_eq!(leading_integer("Long(-9)"), Some("-9"));
        assert_eq!(leading_integer("none"), None);
    }

    #[test]
    fn test_syntax_errors_follow_policy() {
        for policy in [ErrorPolicy::SkipField, ErrorPolicy::SkipEntry] {
            let parser = build(RepositoryParserConfig::new("p", "json").with_error_policy(policy));
            assert!(matches!(parser.parse(&raw("{broken")), Err(ParseError::Json { .. })));
            assert!(matches!(parser.parse(&raw("[1, 2]")), Err(ParseError::Json { .. })));
        }

        let lenient = build(
            RepositoryParserConfig::new("p", "json").with_error_policy(ErrorPolicy::SkipFieldIgnoreError),
        );
        let result = lenient.parse(&raw("{broken")).unwrap();
        assert!(result.entry.fields.is_empty());
        assert!(result.field_failures.is_empty());
    }
}
