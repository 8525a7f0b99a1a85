//! Repository parsing configuration.
//!
//! These types are owned by the configuration store and are read-only from the
//! parsers' point of view: a parser captures what it needs at construction and
//! a configuration change means building a new parser.

use crate::error::ConfigError;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Keyword budget used when a repository does not configure one.
pub const DEFAULT_MAX_KEYWORDS: i32 = 100;

/// Property keys understood by the built-in parsers.
pub mod keys {
    pub const DELIMITER: &str = "delimiter";
    pub const POSITION: &str = "position";
    pub const PATTERN: &str = "pattern";
    pub const GROUP: &str = "group";
    pub const DEFAULT_VALUE: &str = "default_value";
    pub const NUMBER_FORMAT: &str = "number_format";
    pub const DATE_FORMAT: &str = "date_format";
    pub const DATE_TIMEZONE: &str = "date_timezone";
    pub const TRUE_PATTERN: &str = "true_pattern";
    pub const PREPARSE_PATTERN: &str = "preparse_pattern";
    pub const PREPARSE_PATTERN_GROUP: &str = "preparse_pattern_group";
    pub const DATE_PATTERN: &str = "date_pattern";
    pub const LONG_SUFFIX: &str = "long_suffix";
}

/// String-keyed settings bag. Blank values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Non-blank value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn require(&self, key: &str, owner: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingProperty {
            owner: owner.to_string(),
            property: key.to_string(),
        })
    }

    pub fn get_usize(&self, key: &str, owner: &str) -> Result<Option<usize>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value.trim().parse::<usize>().map(Some).map_err(|e| {
                ConfigError::InvalidProperty {
                    owner: owner.to_string(),
                    property: key.to_string(),
                    value: value.to_string(),
                    reason: e.to_string(),
                }
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Properties {
    /// Accepts scalar JSON values so `"position": 1` and `"position": "1"` are equivalent.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut properties = BTreeMap::new();
        for (key, value) in raw {
            let text = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s,
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                other => {
                    return Err(de::Error::custom(format!(
                        "property '{}' must be a scalar, found {}",
                        key, other
                    )))
                }
            };
            properties.insert(key, text);
        }
        Ok(Properties(properties))
    }
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Declared data type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    String,
    Integer,
    Long,
    Double,
    Boolean,
    Date,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Long => "long",
            DataType::Double => "double",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
        }
    }
}

impl FromStr for DataType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "string" => Ok(DataType::String),
            "integer" | "int" => Ok(DataType::Integer),
            "long" => Ok(DataType::Long),
            "double" => Ok(DataType::Double),
            "boolean" | "bool" => Ok(DataType::Boolean),
            "date" => Ok(DataType::Date),
            _ => Err(ConfigError::UnsupportedDataType(s.to_string())),
        }
    }
}

/// How a parser decides whether an entry's source/host concern it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ApplicabilityMode {
    #[default]
    All,
    FilteredCsv,
    FilteredRegex,
}

impl ApplicabilityMode {
    pub fn name(self) -> &'static str {
        match self {
            ApplicabilityMode::All => "all",
            ApplicabilityMode::FilteredCsv => "filtered_csv",
            ApplicabilityMode::FilteredRegex => "filtered_regex",
        }
    }
}

impl FromStr for ApplicabilityMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "all" => Ok(ApplicabilityMode::All),
            "filteredcsv" | "csv" => Ok(ApplicabilityMode::FilteredCsv),
            "filteredregex" | "regex" => Ok(ApplicabilityMode::FilteredRegex),
            _ => Err(ConfigError::UnsupportedOperation(format!(
                "unknown applicability mode '{}'",
                s
            ))),
        }
    }
}

/// What to do when a single field cannot be extracted or converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ErrorPolicy {
    /// Log the failure, omit the field, keep the entry.
    #[default]
    SkipField,
    /// Abort the whole entry.
    SkipEntry,
    /// Omit the field silently.
    SkipFieldIgnoreError,
}

impl ErrorPolicy {
    pub fn name(self) -> &'static str {
        match self {
            ErrorPolicy::SkipField => "skip_field",
            ErrorPolicy::SkipEntry => "skip_entry",
            ErrorPolicy::SkipFieldIgnoreError => "skip_field_ignore_error",
        }
    }
}

impl FromStr for ErrorPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "skipfield" => Ok(ErrorPolicy::SkipField),
            "skipentry" => Ok(ErrorPolicy::SkipEntry),
            "skipfieldignoreerror" => Ok(ErrorPolicy::SkipFieldIgnoreError),
            _ => Err(ConfigError::UnsupportedOperation(format!(
                "unknown error handling policy '{}'",
                s
            ))),
        }
    }
}

macro_rules! string_conversions {
    ($($ty:ty),*) => {$(
        impl TryFrom<String> for $ty {
            type Error = ConfigError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> String {
                value.name().to_string()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    )*};
}

string_conversions!(DataType, ApplicabilityMode, ErrorPolicy);

/// One field a parser extracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryFieldConfig {
    pub name: String,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl RepositoryFieldConfig {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key, value);
        self
    }
}

/// One parser attached to a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryParserConfig {
    pub name: String,
    /// Implementation identifier: a built-in kind or a registered extension.
    #[serde(default = "default_parser_id")]
    pub parser: String,
    #[serde(default)]
    pub mode: ApplicabilityMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_filter: Option<String>,
    #[serde(default)]
    pub error_policy: ErrorPolicy,
    /// `None` inherits the repository budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_keywords: Option<i32>,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
    #[serde(default)]
    pub fields: Vec<RepositoryFieldConfig>,
}

fn default_parser_id() -> String {
    "default".to_string()
}

impl RepositoryParserConfig {
    pub fn new(name: impl Into<String>, parser: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parser: parser.into(),
            mode: ApplicabilityMode::All,
            source_filter: None,
            host_filter: None,
            error_policy: ErrorPolicy::default(),
            max_keywords: None,
            properties: Properties::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key, value);
        self
    }

    pub fn with_field(mut self, field: RepositoryFieldConfig) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn with_filters(
        mut self,
        mode: ApplicabilityMode,
        source_filter: Option<&str>,
        host_filter: Option<&str>,
    ) -> Self {
        self.mode = mode;
        self.source_filter = source_filter.map(str::to_string);
        self.host_filter = host_filter.map(str::to_string);
        self
    }

    pub fn with_max_keywords(mut self, max_keywords: i32) -> Self {
        self.max_keywords = Some(max_keywords);
        self
    }
}

/// A named bucket of log entries and the parsers that feed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    #[serde(default = "default_max_keywords")]
    pub max_keywords: i32,
    #[serde(default)]
    pub parsers: Vec<RepositoryParserConfig>,
}

fn default_max_keywords() -> i32 {
    DEFAULT_MAX_KEYWORDS
}

impl RepositoryConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_keywords: DEFAULT_MAX_KEYWORDS,
            parsers: Vec::new(),
        }
    }

    pub fn with_parser(mut self, parser: RepositoryParserConfig) -> Self {
        self.parsers.push(parser);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parser override if set, repository budget otherwise.
    pub fn effective_max_keywords(&self, parser: &RepositoryParserConfig) -> i32 {
        parser.max_keywords.unwrap_or(self.max_keywords)
    }
}
