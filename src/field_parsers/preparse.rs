use crate::capture::{compile_regex, CaptureGroup};
use crate::config::{keys, RepositoryFieldConfig};
use crate::error::ConfigError;
use regex::Regex;

/// Optional narrowing step run on a raw value before type conversion.
#[derive(Debug, Clone)]
pub struct PreParse {
    regex: Regex,
    group: CaptureGroup,
}

impl PreParse {
    /// `None` when the field has no `preparse_pattern`.
    pub fn from_field(field: &RepositoryFieldConfig) -> Result<Option<Self>, ConfigError> {
        let Some(pattern) = field.properties.get(keys::PREPARSE_PATTERN) else {
            return Ok(None);
        };

        let regex = compile_regex(pattern)?;
        let group = CaptureGroup::resolve(
            field.properties.get(keys::PREPARSE_PATTERN_GROUP),
            &regex,
            &field.name,
        )?;

        Ok(Some(Self { regex, group }))
    }

    /// The configured group when the pattern matches, `raw` unchanged otherwise.
    pub fn apply<'a>(&self, raw: &'a str) -> &'a str {
        self.regex
            .captures(raw)
            .and_then(|captures| self.group.extract(&captures))
            .unwrap_or(raw)
    }
}

pub(crate) fn apply_preparse<'a>(preparse: Option<&PreParse>, raw: Option<&'a str>) -> Option<&'a str> {
    match (preparse, raw) {
        (Some(preparse), Some(raw)) => Some(preparse.apply(raw)),
        (None, raw) => raw,
        (_, None) => None,
    }
}
