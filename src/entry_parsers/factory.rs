use super::{
    DefaultEntryParser, DelimitedEntryParser, EntryParser, JsonEntryParser, RegexEntryParser,
};
use crate::config::{normalize_name, RepositoryConfig, RepositoryParserConfig, DEFAULT_MAX_KEYWORDS};
use crate::error::ConfigError;
use crate::keywords::{Tokenizer, WordTokenizer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds a custom entry parser from its configuration.
pub type ParserConstructor = dyn Fn(
        &RepositoryConfig,
        &RepositoryParserConfig,
        Arc<dyn Tokenizer>,
    ) -> Result<Box<dyn EntryParser>, ConfigError>
    + Send
    + Sync;

/// The built-in strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserKind {
    Default,
    Delimited,
    Regex,
    Json,
}

impl ParserKind {
    pub const ALL: [ParserKind; 4] = [
        ParserKind::Default,
        ParserKind::Delimited,
        ParserKind::Regex,
        ParserKind::Json,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ParserKind::Default => "default",
            ParserKind::Delimited => "delimited",
            ParserKind::Regex => "regex",
            ParserKind::Json => "json",
        }
    }

    /// Accepted spellings, compared after case and `_`/`-` folding.
    fn aliases(self) -> [&'static str; 3] {
        match self {
            ParserKind::Default => ["default", "defaultparser", "defaultentryparser"],
            ParserKind::Delimited => ["delimited", "delimitedparser", "delimitedentryparser"],
            ParserKind::Regex => ["regex", "regexparser", "regexentryparser"],
            ParserKind::Json => ["json", "jsonparser", "jsonentryparser"],
        }
    }

    /// Recognizes `delimited`, `DelimitedEntryParser`, `delimited_parser` and
    /// the same spellings of the other kinds. Anything else is not built in.
    pub fn from_id(id: &str) -> Option<Self> {
        let normalized = normalize_name(id);
        Self::ALL
            .into_iter()
            .find(|kind| kind.aliases().contains(&normalized.as_str()))
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Creates entry parsers from repository configuration.
///
/// Registered constructors take precedence over the built-in kinds, so an
/// extension may reuse a built-in spelling.
#[derive(Clone)]
pub struct EntryParserFactory {
    registry: HashMap<String, Arc<ParserConstructor>>,
    tokenizer: Arc<dyn Tokenizer>,
}

impl fmt::Debug for EntryParserFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut registered: Vec<&String> = self.registry.keys().collect();
        registered.sort();
        f.debug_struct("EntryParserFactory")
            .field("registered", &registered)
            .finish_non_exhaustive()
    }
}

impl Default for EntryParserFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryParserFactory {
    pub fn new() -> Self {
        Self {
            registry: HashMap::new(),
            tokenizer: Arc::new(WordTokenizer),
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn tokenizer(&self) -> Arc<dyn Tokenizer> {
        Arc::clone(&self.tokenizer)
    }

    /// Register a custom parser under `id`, replacing any previous one.
    pub fn register<F>(&mut self, id: impl Into<String>, constructor: F)
    where
        F: Fn(
                &RepositoryConfig,
                &RepositoryParserConfig,
                Arc<dyn Tokenizer>,
            ) -> Result<Box<dyn EntryParser>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.insert(id.into(), Arc::new(constructor));
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.registry.contains_key(id.trim()) || ParserKind::from_id(id).is_some()
    }

    pub fn get_parser(
        &self,
        repository: &RepositoryConfig,
        parser: &RepositoryParserConfig,
    ) -> Result<Box<dyn EntryParser>, ConfigError> {
        let tokenizer = self.tokenizer();
        let id = parser.parser.trim();

        let built: Box<dyn EntryParser> = match (self.registry.get(id), ParserKind::from_id(id)) {
            (Some(constructor), _) => (constructor.as_ref())(repository, parser, tokenizer).map_err(|e| {
                ConfigError::InstantiationFailed {
                    parser: id.to_string(),
                    error_message: e.to_string(),
                }
            })?,
            (None, Some(ParserKind::Default)) => {
                Box::new(DefaultEntryParser::new(repository, parser, tokenizer)?)
            }
            (None, Some(ParserKind::Delimited)) => {
                Box::new(DelimitedEntryParser::new(repository, parser, tokenizer)?)
            }
            (None, Some(ParserKind::Regex)) => Box::new(RegexEntryParser::new(repository, parser, tokenizer)?),
            (None, Some(ParserKind::Json)) => Box::new(JsonEntryParser::new(repository, parser, tokenizer)?),
            (None, None) => return Err(ConfigError::ParserNotFound(id.to_string())),
        };

        debug!(
            repository = %repository.name,
            parser = %parser.name,
            kind = %built.kind(),
            "Constructed entry parser"
        );
        Ok(built)
    }

    /// A pass-through parser for `repository_name` with the standard keyword budget.
    pub fn get_default_parser(&self, repository_name: &str) -> Box<dyn EntryParser> {
        Box::new(DefaultEntryParser::fallback(
            repository_name,
            DEFAULT_MAX_KEYWORDS,
            self.tokenizer(),
        ))
    }

    /// A pass-through parser using the repository's own keyword budget.
    pub fn default_parser_for(&self, repository: &RepositoryConfig) -> Box<dyn EntryParser> {
        Box::new(DefaultEntryParser::fallback(
            &repository.name,
            repository.max_keywords,
            self.tokenizer(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::keys;
    use crate::entry_parsers::EntryParserCore;
    use crate::error::ParseError;
    use crate::models::{FieldValue, RawEntry};
    use crate::parse_result::ParseResult;

    /// Stores the message length as a field.
    struct LengthParser {
        core: EntryParserCore,
    }

    impl EntryParser for LengthParser {
        fn core(&self) -> &EntryParserCore {
            &self.core
        }

        fn parse(&self, entry: &RawEntry) -> Result<ParseResult, ParseError> {
            let mut draft = self.core.prepare(entry)?;
            draft
                .fields
                .insert("length".to_string(), FieldValue::Long(entry.message.len() as i64));
            Ok(self.core.finish(entry, draft))
        }
    }

    fn length_factory() -> EntryParserFactory {
        let mut factory = EntryParserFactory::new();
        factory.register("acme.LengthParser", |repository, parser, tokenizer| {
            let core = EntryParserCore::new(repository, parser, "acme.LengthParser", tokenizer)?;
            Ok(Box::new(LengthParser { core }) as Box<dyn EntryParser>)
        });
        factory
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!(ParserKind::from_id("delimited"), Some(ParserKind::Delimited));
        assert_eq!(ParserKind::from_id("DelimitedEntryParser"), Some(ParserKind::Delimited));
        assert_eq!(ParserKind::from_id("JSON"), Some(ParserKind::Json));
        assert_eq!(ParserKind::from_id("json_parser"), Some(ParserKind::Json));
        assert_eq!(ParserKind::from_id(" regex-entry-parser "), Some(ParserKind::Regex));
        for id in ["", "parser", "entryparser", "com.acme.", "org.logs.parsers.RegexEntryParser"] {
            assert_eq!(ParserKind::from_id(id), None, "{id:?}");
        }
        assert_eq!(ParserKind::from_id("acme.LengthParser"), None);
        for kind in ParserKind::ALL {
            assert_eq!(ParserKind::from_id(kind.id()), Some(kind));
        }
    }

    #[test]
    fn test_builds_built_in_parsers() {
        let factory = EntryParserFactory::new();
        let repository = RepositoryConfig::new("repo");
        let parser = RepositoryParserConfig::new("csv", "delimited").with_property(keys::DELIMITER, ",");
        let built = factory.get_parser(&repository, &parser).unwrap();
        assert_eq!(built.kind(), "delimited");
        assert_eq!(built.name(), "csv");
    }

    #[test]
    fn test_unknown_parser_is_not_found() {
        let factory = EntryParserFactory::new();
        let parser = RepositoryParserConfig::new("p", "com.example.Missing");
        assert!(matches!(
            factory.get_parser(&RepositoryConfig::new("repo"), &parser),
            Err(ConfigError::ParserNotFound(ref id)) if id == "com.example.Missing"
        ));
    }

    #[test]
    fn test_registered_parser_is_constructed() {
        let factory = length_factory();
        assert!(factory.is_registered("acme.LengthParser"));

        let parser = RepositoryParserConfig::new("len", "acme.LengthParser");
        let built = factory.get_parser(&RepositoryConfig::new("repo"), &parser).unwrap();
        assert_eq!(built.kind(), "acme.LengthParser");

        let raw = RawEntry::new("2024-01-01T00:00:00.000Z", "s", "h", "6", "four");
        let result = built.parse(&raw).unwrap();
        assert_eq!(result.entry.field("length"), Some(&FieldValue::Long(4)));
    }

    #[test]
    fn test_malformed_ids_are_not_found() {
        let factory = EntryParserFactory::new();
        for id in ["com.acme.", "parser", "  "] {
            let parser = RepositoryParserConfig::new("p", id);
            assert!(matches!(
                factory.get_parser(&RepositoryConfig::new("repo"), &parser),
                Err(ConfigError::ParserNotFound(_))
            ));
        }
    }

    #[test]
    fn test_registration_shadows_built_in_spelling() {
        let mut factory = EntryParserFactory::new();
        factory.register("com.acme.parsers.JsonEntryParser", |repository, parser, tokenizer| {
            let core = EntryParserCore::new(repository, parser, "acme.json", tokenizer)?;
            Ok(Box::new(LengthParser { core }) as Box<dyn EntryParser>)
        });
        factory.register("json", |repository, parser, tokenizer| {
            let core = EntryParserCore::new(repository, parser, "acme.plain-json", tokenizer)?;
            Ok(Box::new(LengthParser { core }) as Box<dyn EntryParser>)
        });

        let repository = RepositoryConfig::new("repo");
        let dotted = RepositoryParserConfig::new("a", "com.acme.parsers.JsonEntryParser");
        assert_eq!(factory.get_parser(&repository, &dotted).unwrap().kind(), "acme.json");
        let plain = RepositoryParserConfig::new("b", "json");
        assert_eq!(factory.get_parser(&repository, &plain).unwrap().kind(), "acme.plain-json");
        let aliased = RepositoryParserConfig::new("c", "JsonEntryParser");
        assert_eq!(factory.get_parser(&repository, &aliased).unwrap().kind(), "json");
    }

    #[test]
    fn test_failing_constructor_is_instantiation_failure() {
        let mut factory = EntryParserFactory::new();
        factory.register("broken", |_, _, _| {
            Err(ConfigError::UnsupportedOperation("not today".to_string()))
        });
        let parser = RepositoryParserConfig::new("p", "broken");
        assert!(matches!(
            factory.get_parser(&RepositoryConfig::new("repo"), &parser),
            Err(ConfigError::InstantiationFailed { .. })
        ));
    }

    #[test]
    fn test_default_parsers() {
        let factory = EntryParserFactory::new();
        let parser = factory.get_default_parser("repo");
        assert_eq!(parser.kind(), "default");
        assert!(parser.is_applicable("x", "y"));
        assert_eq!(parser.core().max_keywords(), DEFAULT_MAX_KEYWORDS);

        let mut repository = RepositoryConfig::new("small");
        repository.max_keywords = 5;
        assert_eq!(factory.default_parser_for(&repository).core().max_keywords(), 5);
    }
}
