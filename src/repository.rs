use crate::config::RepositoryConfig;
use crate::entry_parsers::{EntryParser, EntryParserFactory};
use crate::error::{ConfigError, ParseError};
use crate::models::RawEntry;
use crate::parse_result::ParseResult;
use tracing::debug;

/// The parsers of one repository, ready to route entries.
///
/// Building a `Repository` builds every configured parser, so a repository
/// with any invalid parser configuration refuses to start. Parsers are not
/// shared between threads; each worker builds its own `Repository`.
pub struct Repository {
    name: String,
    parsers: Vec<Box<dyn EntryParser>>,
    fallback: Box<dyn EntryParser>,
}

impl Repository {
    pub fn new(config: &RepositoryConfig, factory: &EntryParserFactory) -> Result<Self, ConfigError> {
        let parsers = config
            .parsers
            .iter()
            .map(|parser| factory.get_parser(config, parser))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            repository = %config.name,
            parsers = parsers.len(),
            "Repository parsers ready"
        );

        Ok(Self {
            name: config.name.clone(),
            parsers,
            fallback: factory.default_parser_for(config),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parser_names(&self) -> Vec<&str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    /// First configured parser applicable to `source`/`host`, or the
    /// pass-through parser when none is.
    pub fn select(&self, source: &str, host: &str) -> &dyn EntryParser {
        self.parsers
            .iter()
            .find(|parser| parser.is_applicable(source, host))
            .map(|parser| parser.as_ref())
            .unwrap_or_else(|| self.fallback.as_ref())
    }

    pub fn parse(&self, entry: &RawEntry) -> Result<ParseResult, ParseError> {
        let parser = self.select(&entry.source, &entry.host);
        let result = parser.parse(entry);
        if let Err(error) = &result {
            debug!(
                repository = %self.name,
                parser = %parser.name(),
                reason = error.kind(),
                %error,
                "Entry skipped"
            );
        }
        result
    }
}
