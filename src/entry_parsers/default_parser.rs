use super::base::EntryParserCore;
use super::factory::ParserKind;
use super::EntryParser;
use crate::config::{RepositoryConfig, RepositoryParserConfig};
use crate::error::{ConfigError, ParseError};
use crate::keywords::Tokenizer;
use crate::models::RawEntry;
use crate::parse_result::ParseResult;
use std::sync::Arc;

/// Pass-through parser: no field extraction, keywords from the whole message.
/// Pre-parsed fields supplied with the entry are still kept.
#[derive(Debug)]
pub struct DefaultEntryParser {
    core: EntryParserCore,
}

impl DefaultEntryParser {
    pub fn new(
        repository: &RepositoryConfig,
        parser: &RepositoryParserConfig,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            core: EntryParserCore::new(repository, parser, ParserKind::Default.id(), tokenizer)?,
        })
    }

    /// Applies to everything, with the given keyword budget.
    pub fn fallback(repository: &str, max_keywords: i32, tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            core: EntryParserCore::fallback(
                repository,
                max_keywords,
                ParserKind::Default.id(),
                tokenizer,
            ),
        }
    }
}

impl EntryParser for DefaultEntryParser {
    fn core(&self) -> &EntryParserCore {
        &self.core
    }

    fn parse(&self, entry: &RawEntry) -> Result<ParseResult, ParseError> {
        let draft = self.core.prepare(entry)?;
        Ok(self.core.finish(entry, draft))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_KEYWORDS;
    use crate::keywords::WordTokenizer;
    use crate::models::Severity;

    #[test]
    fn test_produces_entry_without_fields() {
        let parser = DefaultEntryParser::fallback("repo", DEFAULT_MAX_KEYWORDS, Arc::new(WordTokenizer));
        let raw = RawEntry::new("2024-01-01T00:00:00.000Z", "s1", "h1", "Warning", "Plain old message");
        let result = parser.parse(&raw).unwrap();

        assert!(result.entry.fields.is_empty());
        assert_eq!(result.entry.severity, Severity::Warning);
        assert_eq!(result.entry.message, "Plain old message");
        assert_eq!(
            result.entry.keywords,
            vec!["plain", "old", "message", "s=s1", "h=h1", "v=4"]
        );
        assert!(parser.is_applicable("anything", "anywhere"));
        assert_eq!(parser.kind(), "default");
    }

    #[test]
    fn test_malformed_timestamp_is_skipped() {
        let parser = DefaultEntryParser::fallback("repo", 10, Arc::new(WordTokenizer));
        let raw = RawEntry::new("yesterday", "s1", "h1", "1", "boom");
        assert!(matches!(parser.parse(&raw), Err(ParseError::InvalidTimestamp { .. })));
    }
}
