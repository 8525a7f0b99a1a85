use crate::capture::compile_full_match;
use crate::config::{ApplicabilityMode, ErrorPolicy, RepositoryConfig, RepositoryParserConfig};
use crate::error::{ConfigError, FieldParseError, ParseError};
use crate::field_parsers::FieldParser;
use crate::keywords::{derive_keywords, Tokenizer};
use crate::models::{FieldValue, ParsedEntry, RawEntry, Severity};
use crate::parse_result::{FieldFailure, ParseResult};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Wire format of `RawEntry::timestamp`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%3fZ";
const TIMESTAMP_DESCRIPTION: &str = "yyyy-MM-dd'T'HH:mm:ss.SSS'Z'";

/// Matcher for one of source or host.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Lowercased names, compared case-insensitively.
    Csv(Vec<String>),
    /// Must match the whole value.
    Regex(Regex),
}

impl Filter {
    fn build(mode: ApplicabilityMode, raw: Option<&str>) -> Result<Option<Self>, ConfigError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let filter = match mode {
            ApplicabilityMode::All => return Ok(None),
            ApplicabilityMode::FilteredCsv => Filter::Csv(
                raw.split(',')
                    .map(|item| item.trim().to_lowercase())
                    .filter(|item| !item.is_empty())
                    .collect(),
            ),
            ApplicabilityMode::FilteredRegex => Filter::Regex(compile_full_match(raw)?),
        };
        Ok(Some(filter))
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Filter::Csv(names) => {
                let value = value.trim().to_lowercase();
                names.contains(&value)
            }
            Filter::Regex(regex) => regex.is_match(value),
        }
    }
}

/// Decides whether a parser is eligible for an entry's source and host.
#[derive(Debug, Clone)]
pub enum Applicability {
    All,
    /// Either configured filter matching is enough.
    Filtered {
        source: Option<Filter>,
        host: Option<Filter>,
    },
}

impl Applicability {
    pub fn from_config(parser: &RepositoryParserConfig) -> Result<Self, ConfigError> {
        if parser.mode == ApplicabilityMode::All {
            return Ok(Applicability::All);
        }

        let source = Filter::build(parser.mode, parser.source_filter.as_deref())?;
        let host = Filter::build(parser.mode, parser.host_filter.as_deref())?;
        if source.is_none() && host.is_none() {
            return Err(ConfigError::MissingFilter(parser.name.clone()));
        }

        Ok(Applicability::Filtered { source, host })
    }

    pub fn is_applicable(&self, source: &str, host: &str) -> bool {
        match self {
            Applicability::All => true,
            Applicability::Filtered {
                source: source_filter,
                host: host_filter,
            } => {
                source_filter.as_ref().is_some_and(|f| f.matches(source))
                    || host_filter.as_ref().is_some_and(|f| f.matches(host))
            }
        }
    }
}

/// Work in progress for one entry: validated timestamp plus the fields
/// collected so far.
#[derive(Debug)]
pub struct EntryDraft {
    pub timestamp: DateTime<Utc>,
    pub fields: BTreeMap<String, FieldValue>,
    pub failures: Vec<FieldFailure>,
    started: Instant,
}

/// State every strategy shares, computed once at construction.
pub struct EntryParserCore {
    name: String,
    repository: String,
    kind: String,
    applicability: Applicability,
    max_keywords: i32,
    error_policy: ErrorPolicy,
    tokenizer: Arc<dyn Tokenizer>,
}

impl fmt::Debug for EntryParserCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryParserCore")
            .field("name", &self.name)
            .field("repository", &self.repository)
            .field("kind", &self.kind)
            .field("applicability", &self.applicability)
            .field("max_keywords", &self.max_keywords)
            .field("error_policy", &self.error_policy)
            .finish_non_exhaustive()
    }
}

impl EntryParserCore {
    pub fn new(
        repository: &RepositoryConfig,
        parser: &RepositoryParserConfig,
        kind: &str,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            name: parser.name.clone(),
            repository: repository.name.clone(),
            kind: kind.to_string(),
            applicability: Applicability::from_config(parser)?,
            max_keywords: repository.effective_max_keywords(parser),
            error_policy: parser.error_policy,
            tokenizer,
        })
    }

    /// Pass-through core used when a repository has no applicable parser.
    pub fn fallback(
        repository: &str,
        max_keywords: i32,
        kind: &str,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Self {
        Self {
            name: "default".to_string(),
            repository: repository.to_string(),
            kind: kind.to_string(),
            applicability: Applicability::All,
            max_keywords,
            error_policy: ErrorPolicy::SkipField,
            tokenizer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn applicability(&self) -> &Applicability {
        &self.applicability
    }

    pub fn max_keywords(&self) -> i32 {
        self.max_keywords
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    pub fn is_applicable(&self, source: &str, host: &str) -> bool {
        self.applicability.is_applicable(source, host)
    }

    /// Validate arguments, parse the timestamp and merge upstream fields.
    pub fn prepare(&self, entry: &RawEntry) -> Result<EntryDraft, ParseError> {
        let started = Instant::now();

        for (argument, value) in [
            ("timestamp", &entry.timestamp),
            ("source", &entry.source),
            ("host", &entry.host),
            ("severity", &entry.severity),
            ("message", &entry.message),
        ] {
            if value.trim().is_empty() {
                warn!(parser = %self.name, argument, "Blank required argument");
                return Err(ParseError::BlankArgument { argument });
            }
        }

        let timestamp = parse_timestamp(&entry.timestamp)?;
        let mut draft = EntryDraft {
            timestamp,
            fields: BTreeMap::new(),
            failures: Vec::new(),
            started,
        };

        if let Some(blob) = entry.fields.as_deref().filter(|b| !b.trim().is_empty()) {
            match serde_json::from_str::<serde_json::Value>(blob) {
                Ok(serde_json::Value::Object(map)) => {
                    for (key, value) in &map {
                        draft.fields.insert(key.clone(), FieldValue::from_json(value));
                    }
                }
                Ok(other) => self.on_json_error(format!(
                    "pre-parsed fields must be a JSON object, found {}",
                    json_type_name(&other)
                ))?,
                Err(e) => self.on_json_error(format!("pre-parsed fields: {}", e))?,
            }
        }

        Ok(draft)
    }

    /// Run `parser` on `raw` and store the value, or apply the error policy.
    pub fn apply_field(
        &self,
        draft: &mut EntryDraft,
        parser: &dyn FieldParser,
        raw: Option<&str>,
    ) -> Result<(), ParseError> {
        match parser.parse(raw) {
            Ok(value) => {
                draft.fields.insert(parser.field_name().to_string(), value);
                Ok(())
            }
            Err(error) => self.on_field_error(draft, parser.field_name(), error),
        }
    }

    pub fn on_field_error(
        &self,
        draft: &mut EntryDraft,
        field: &str,
        error: FieldParseError,
    ) -> Result<(), ParseError> {
        match self.error_policy {
            ErrorPolicy::SkipField => {
                warn!(parser = %self.name, field, error = %error, "Skipping field");
                draft.failures.push(FieldFailure {
                    field: field.to_string(),
                    error,
                });
                Ok(())
            }
            ErrorPolicy::SkipEntry => Err(ParseError::Field {
                field: field.to_string(),
                source: error,
            }),
            ErrorPolicy::SkipFieldIgnoreError => Ok(()),
        }
    }

    /// A JSON document is a single unit: `SkipField` and `SkipEntry` both
    /// reject the entry.
    pub fn on_json_error(&self, message: String) -> Result<(), ParseError> {
        match self.error_policy {
            ErrorPolicy::SkipFieldIgnoreError => Ok(()),
            ErrorPolicy::SkipField | ErrorPolicy::SkipEntry => {
                debug!(parser = %self.name, %message, "Rejecting malformed JSON");
                Err(ParseError::Json { message })
            }
        }
    }

    /// Normalize severity, derive keywords and build the result.
    pub fn finish(&self, entry: &RawEntry, draft: EntryDraft) -> ParseResult {
        let severity = Severity::parse(Some(&entry.severity));
        let keywords = derive_keywords(
            self.tokenizer.as_ref(),
            &entry.message,
            &entry.source,
            &entry.host,
            severity,
            self.max_keywords,
        );

        let parsed = ParsedEntry {
            timestamp: draft.timestamp,
            saved_timestamp: Utc::now(),
            source: entry.source.clone(),
            host: entry.host.clone(),
            severity,
            message: entry.message.clone(),
            keywords,
            fields: draft.fields,
        };

        debug!(
            parser = %self.name,
            fields = parsed.fields.len(),
            tolerated = draft.failures.len(),
            "Parsed entry"
        );

        ParseResult::new(parsed, self.name.clone())
            .with_field_failures(draft.failures)
            .with_processing_time(draft.started.elapsed().as_micros() as u64)
    }
}

pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, ParseError> {
    NaiveDateTime::parse_from_str(input.trim(), TIMESTAMP_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| ParseError::InvalidTimestamp {
            input: input.to_string(),
            expected_format: TIMESTAMP_DESCRIPTION,
        })
}

pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
