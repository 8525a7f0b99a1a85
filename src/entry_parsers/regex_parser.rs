use super::base::EntryParserCore;
use super::factory::ParserKind;
use super::EntryParser;
use crate::capture::{compile_full_match, compile_regex, CaptureGroup};
use crate::config::{keys, RepositoryConfig, RepositoryParserConfig};
use crate::error::{ConfigError, FieldParseError, ParseError};
use crate::field_parsers::{FieldParser, FieldParserFactory};
use crate::keywords::Tokenizer;
use crate::models::RawEntry;
use crate::parse_result::ParseResult;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

/// Where a field's raw value comes from.
#[derive(Debug)]
enum FieldSource {
    /// The field's own pattern, searched anywhere in the message.
    Own { regex: Regex, group: CaptureGroup },
    /// A group of the entry-level pattern.
    Entry(CaptureGroup),
}

#[derive(Debug)]
struct RegexField {
    source: FieldSource,
    parser: Box<dyn FieldParser>,
}

/// Extracts fields from capture groups. The optional entry-level `pattern`
/// must match the whole message; field-level patterns only need to occur in it.
#[derive(Debug)]
pub struct RegexEntryParser {
    core: EntryParserCore,
    pattern: Option<(Regex, String)>,
    fields: Vec<RegexField>,
}

impl RegexEntryParser {
    pub fn new(
        repository: &RepositoryConfig,
        parser: &RepositoryParserConfig,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self, ConfigError> {
        let pattern = match parser.properties.get(keys::PATTERN) {
            Some(text) => Some((compile_full_match(text)?, text.to_string())),
            None => None,
        };

        let fields = parser
            .fields
            .iter()
            .map(|field| {
                let group = field.properties.get(keys::GROUP);
                let source = match (field.properties.get(keys::PATTERN), &pattern) {
                    (Some(own), _) => {
                        let regex = compile_regex(own)?;
                        let group = CaptureGroup::resolve(group, &regex, &field.name)?;
                        FieldSource::Own { regex, group }
                    }
                    (None, Some((entry_regex, _))) => {
                        FieldSource::Entry(CaptureGroup::resolve(group, entry_regex, &field.name)?)
                    }
                    (None, None) => {
                        return Err(ConfigError::MissingProperty {
                            owner: format!("field '{}'", field.name),
                            property: keys::PATTERN.to_string(),
                        })
                    }
                };

                Ok(RegexField {
                    source,
                    parser: FieldParserFactory::get_parser(field)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            core: EntryParserCore::new(repository, parser, ParserKind::Regex.id(), tokenizer)?,
            pattern,
            fields,
        })
    }
}

impl EntryParser for RegexEntryParser {
    fn core(&self) -> &EntryParserCore {
        &self.core
    }

    fn parse(&self, entry: &RawEntry) -> Result<ParseResult, ParseError> {
        let mut draft = self.core.prepare(entry)?;
        let message = entry.message.as_str();

        let entry_captures = self
            .pattern
            .as_ref()
            .and_then(|(regex, _)| regex.captures(message));
        if self.pattern.is_some() && entry_captures.is_none() {
            debug!(parser = %self.core.name(), "Entry pattern did not match");
        }

        for field in &self.fields {
            let own_captures;
            let (captures, group, pattern) = match &field.source {
                FieldSource::Own { regex, group } => {
                    own_captures = regex.captures(message);
                    (own_captures.as_ref(), group, regex.as_str())
                }
                FieldSource::Entry(group) => {
                    let pattern = self.pattern.as_ref().map_or("", |(_, text)| text.as_str());
                    (entry_captures.as_ref(), group, pattern)
                }
            };

            match captures {
                // A group that did not participate leaves the value to the field's default.
                Some(captures) => {
                    self.core
                        .apply_field(&mut draft, field.parser.as_ref(), group.extract(captures))?
                }
                None => self.core.on_field_error(
                    &mut draft,
                    field.parser.field_name(),
                    FieldParseError::NoMatch {
                        pattern: pattern.to_string(),
                    },
                )?,
            }
        }

        Ok(self.core.finish(entry, draft))
    }
}
