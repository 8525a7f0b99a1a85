use crate::error::ConfigError;
use regex::{Captures, Regex};
use std::fmt;

pub(crate) fn compile_regex(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        error_message: e.to_string(),
    })
}

/// Compile `pattern` so that it only matches the whole input.
pub(crate) fn compile_full_match(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        error_message: e.to_string(),
    })
}

/// A capture group addressed by number or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureGroup {
    Index(usize),
    Name(String),
}

impl CaptureGroup {
    /// Parse a group reference and check that `regex` actually has it.
    /// `None` means group 1.
    pub fn resolve(group_spec: Option<&str>, regex: &Regex, field: &str) -> Result<Self, ConfigError> {
        let group = match group_spec.map(str::trim) {
            None => CaptureGroup::Index(1),
            Some(s) => match s.parse::<usize>() {
                Ok(index) => CaptureGroup::Index(index),
                Err(_) => CaptureGroup::Name(s.to_string()),
            },
        };

        let exists = match &group {
            CaptureGroup::Index(index) => *index < regex.captures_len(),
            CaptureGroup::Name(name) => regex.capture_names().flatten().any(|n| n == name.as_str()),
        };

        if exists {
            Ok(group)
        } else {
            Err(ConfigError::InvalidGroup {
                field: field.to_string(),
                group: group.to_string(),
                available: regex.captures_len() - 1,
            })
        }
    }

    /// Text of this group, `None` when it did not participate in the match.
    pub fn extract<'h>(&self, captures: &Captures<'h>) -> Option<&'h str> {
        let matched = match self {
            CaptureGroup::Index(index) => captures.get(*index),
            CaptureGroup::Name(name) => captures.name(name),
        };
        matched.map(|m| m.as_str())
    }
}

impl fmt::Display for CaptureGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureGroup::Index(index) => write!(f, "{}", index),
            CaptureGroup::Name(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_numbered_and_named_groups() {
        let regex = compile_regex(r"(?P<user>\w+)@(\w+)").unwrap();
        assert_eq!(
            CaptureGroup::resolve(None, &regex, "f").unwrap(),
            CaptureGroup::Index(1)
        );
        assert_eq!(
            CaptureGroup::resolve(Some("user"), &regex, "f").unwrap(),
            CaptureGroup::Name("user".to_string())
        );
        assert!(matches!(
            CaptureGroup::resolve(Some("3"), &regex, "f"),
            Err(ConfigError::InvalidGroup { available: 2, .. })
        ));
        assert!(CaptureGroup::resolve(Some("host"), &regex, "f").is_err());
    }

    #[test]
    fn test_full_match_anchors_pattern() {
        let regex = compile_full_match(r"\d+").unwrap();
        assert!(regex.is_match("123"));
        assert!(!regex.is_match("a123"));

        let alternation = compile_full_match("a|b").unwrap();
        assert!(!alternation.is_match("ab"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        assert!(matches!(
            compile_regex("(unclosed"),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}
