use super::base::EntryParserCore;
use super::factory::ParserKind;
use super::EntryParser;
use crate::config::{keys, RepositoryConfig, RepositoryParserConfig};
use crate::error::{ConfigError, FieldParseError, ParseError};
use crate::field_parsers::{FieldParser, FieldParserFactory};
use crate::keywords::Tokenizer;
use crate::models::RawEntry;
use crate::parse_result::ParseResult;
use std::sync::Arc;

#[derive(Debug)]
struct DelimitedField {
    /// 0-based token index.
    index: usize,
    parser: Box<dyn FieldParser>,
}

/// Splits the message on a fixed delimiter and reads fields by 1-based position.
#[derive(Debug)]
pub struct DelimitedEntryParser {
    core: EntryParserCore,
    delimiter: String,
    fields: Vec<DelimitedField>,
}

impl DelimitedEntryParser {
    pub fn new(
        repository: &RepositoryConfig,
        parser: &RepositoryParserConfig,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self, ConfigError> {
        let owner = format!("parser '{}'", parser.name);
        let delimiter = unescape(parser.properties.require(keys::DELIMITER, &owner)?);

        let fields = parser
            .fields
            .iter()
            .map(|field| {
                let owner = format!("field '{}'", field.name);
                let index = match field.properties.get_usize(keys::POSITION, &owner) {
                    Ok(Some(position)) if position > 0 => position - 1,
                    Ok(None) => {
                        return Err(ConfigError::MissingProperty {
                            owner,
                            property: keys::POSITION.to_string(),
                        })
                    }
                    _ => {
                        return Err(ConfigError::InvalidPosition {
                            field: field.name.clone(),
                            position: field.properties.get(keys::POSITION).unwrap_or_default().to_string(),
                        })
                    }
                };

                Ok(DelimitedField {
                    index,
                    parser: FieldParserFactory::get_parser(field)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            core: EntryParserCore::new(repository, parser, ParserKind::Delimited.id(), tokenizer)?,
            delimiter,
            fields,
        })
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }
}

/// `\t` and `\s` in configuration files stand for a tab and a space.
fn unescape(delimiter: &str) -> String {
    delimiter.replace("\\t", "\t").replace("\\s", " ")
}

impl EntryParser for DelimitedEntryParser {
    fn core(&self) -> &EntryParserCore {
        &self.core
    }

    fn parse(&self, entry: &RawEntry) -> Result<ParseResult, ParseError> {
        let mut draft = self.core.prepare(entry)?;
        let tokens: Vec<&str> = entry.message.split(self.delimiter.as_str()).collect();

        for field in &self.fields {
            match tokens.get(field.index) {
                Some(token) => self.core.apply_field(&mut draft, field.parser.as_ref(), Some(*token))?,
                None => self.core.on_field_error(
                    &mut draft,
                    field.parser.field_name(),
                    FieldParseError::PositionOutOfRange {
                        position: field.index + 1,
                        available: tokens.len(),
                    },
                )?,
            }
        }

        Ok(self.core.finish(entry, draft))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataType, ErrorPolicy, RepositoryFieldConfig};
    use crate::keywords::WordTokenizer;
    use crate::models::FieldValue;

    fn build(parser: RepositoryParserConfig) -> Result<DelimitedEntryParser, ConfigError> {
        DelimitedEntryParser::new(&RepositoryConfig::new("repo"), &parser, Arc::new(WordTokenizer))
    }

    fn positioned(name: &str, data_type: DataType, position: &str) -> RepositoryFieldConfig {
        RepositoryFieldConfig::new(name, data_type).with_property(keys::POSITION, position)
    }

    fn raw(message: &str) -> RawEntry {
        RawEntry::new("2024-01-01T00:00:00.000Z", "app", "host", "6", message)
    }

    #[test]
    fn test_fields_by_position() {
        let parser = build(
            RepositoryParserConfig::new("p", "delimited")
                .with_property(keys::DELIMITER, "|")
                .with_field(positioned("first", DataType::String, "1"))
                .with_field(positioned("third", DataType::String, "3")),
        )
        .unwrap();

        let result = parser.parse(&raw("a|b|c")).unwrap();
        assert_eq!(result.entry.fields.len(), 2);
        assert_eq!(result.entry.field("first"), Some(&FieldValue::String("a".into())));
        assert_eq!(result.entry.field("third"), Some(&FieldValue::String("c".into())));
    }

    #[test]
    fn test_empty_tokens_are_kept() {
        let parser = build(
            RepositoryParserConfig::new("p", "delimited")
                .with_property(keys::DELIMITER, ",")
                .with_field(positioned("third", DataType::Integer, "3")),
        )
        .unwrap();
        let result = parser.parse(&raw("x,,7")).unwrap();
        assert_eq!(result.entry.field("third"), Some(&FieldValue::Integer(7)));
    }

    #[test]
    fn test_tab_and_multi_char_delimiters() {
        let tab = build(
            RepositoryParserConfig::new("p", "delimited")
                .with_property(keys::DELIMITER, "\\t")
                .with_field(positioned("second", DataType::String, "2")),
        )
        .unwrap();
        assert_eq!(tab.delimiter(), "\t");
        let result = tab.parse(&raw("one\ttwo")).unwrap();
        assert_eq!(result.entry.field("second"), Some(&FieldValue::String("two".into())));

        let double_colon = build(
            RepositoryParserConfig::new("p", "delimited")
                .with_property(keys::DELIMITER, "::")
                .with_field(positioned("second", DataType::String, "2")),
        )
        .unwrap();
        let result = double_colon.parse(&raw("a::b:c")).unwrap();
        assert_eq!(result.entry.field("second"), Some(&FieldValue::String("b:c".into())));

        let space = build(
            RepositoryParserConfig::new("p", "delimited")
                .with_property(keys::DELIMITER, "\\s")
                .with_field(positioned("second", DataType::String, "2")),
        )
        .unwrap();
        assert_eq!(space.delimiter(), " ");
        let result = space.parse(&raw("GET /health")).unwrap();
        assert_eq!(result.entry.field("second"), Some(&FieldValue::String("/health".into())));
    }

    #[test]
    fn test_out_of_range_position_follows_policy() {
        let config = RepositoryParserConfig::new("p", "delimited")
            .with_property(keys::DELIMITER, "|")
            .with_field(positioned("first", DataType::String, "1"))
            .with_field(positioned("fifth", DataType::String, "5"));

        let result = build(config.clone()).unwrap().parse(&raw("a|b")).unwrap();
        assert_eq!(result.entry.fields.len(), 1);
        assert_eq!(result.field_failures[0].field, "fifth");
        assert_eq!(
            result.field_failures[0].error,
            FieldParseError::PositionOutOfRange {
                position: 5,
                available: 2
            }
        );

        let strict = build(config.with_error_policy(ErrorPolicy::SkipEntry)).unwrap();
        assert!(matches!(
            strict.parse(&raw("a|b")),
            Err(ParseError::Field { ref field, .. }) if field == "fifth"
        ));
    }

    #[test]
    fn test_configuration_errors() {
        let missing_delimiter = build(
            RepositoryParserConfig::new("p", "delimited")
                .with_field(positioned("f", DataType::String, "1")),
        );
        assert!(matches!(
            missing_delimiter,
            Err(ConfigError::MissingProperty { ref property, .. }) if property == "delimiter"
        ));

        for blank in [" ", "\t", "   "] {
            let blank_delimiter = build(
                RepositoryParserConfig::new("p", "delimited")
                    .with_property(keys::DELIMITER, blank)
                    .with_field(positioned("f", DataType::String, "1")),
            );
            assert!(matches!(
                blank_delimiter,
                Err(ConfigError::MissingProperty { ref property, .. }) if property == "delimiter"
            ));
        }

        for position in ["0", "-1", "first"] {
            let bad_position = build(
                RepositoryParserConfig::new("p", "delimited")
                    .with_property(keys::DELIMITER, "|")
                    .with_field(positioned("f", DataType::String, position)),
            );
            assert!(matches!(bad_position, Err(ConfigError::InvalidPosition { .. })));
        }

        let missing_position = build(
            RepositoryParserConfig::new("p", "delimited")
                .with_property(keys::DELIMITER, "|")
                .with_field(RepositoryFieldConfig::new("f", DataType::String)),
        );
        assert!(matches!(missing_position, Err(ConfigError::MissingProperty { .. })));
    }
}
