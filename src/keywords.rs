//! Search keyword derivation.

use crate::models::Severity;
use std::collections::HashSet;

/// Splits free text into lowercase search terms.
///
/// Implementations must be shareable across workers; parsers hold them behind
/// an `Arc`.
pub trait Tokenizer: Send + Sync {
    /// At most `max_terms` distinct terms in first-seen order. `max_terms <= 0`
    /// means unbounded.
    fn tokenize(&self, text: &str, max_terms: i32) -> Vec<String>;
}

/// Word tokenizer that keeps dotted, dashed and `@`/`:` joined tokens whole,
/// so IP addresses, host names, e-mail addresses and `key:value` pairs stay
/// searchable as a unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl WordTokenizer {
    fn is_joiner(c: char) -> bool {
        matches!(c, '.' | '-' | '_' | '@' | ':')
    }
}

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str, max_terms: i32) -> Vec<String> {
        let limit = usize::try_from(max_terms).ok().filter(|l| *l > 0);
        let chars: Vec<char> = text.chars().collect();
        let mut terms = Vec::new();
        let mut seen = HashSet::new();
        let mut current = String::new();

        let mut flush = |current: &mut String, terms: &mut Vec<String>| {
            if !current.is_empty() {
                let term = std::mem::take(current);
                if seen.insert(term.clone()) {
                    terms.push(term);
                }
            }
        };

        for (i, &c) in chars.iter().enumerate() {
            if limit.is_some_and(|l| terms.len() >= l) {
                break;
            }

            if c.is_alphanumeric() {
                current.extend(c.to_lowercase());
                continue;
            }

            let joins = Self::is_joiner(c)
                && !current.is_empty()
                && chars.get(i + 1).is_some_and(|next| next.is_alphanumeric());
            if joins {
                current.push(c);
            } else {
                flush(&mut current, &mut terms);
            }
        }
        flush(&mut current, &mut terms);

        if let Some(limit) = limit {
            terms.truncate(limit);
        }
        terms
    }
}

/// Message terms capped at `max_keywords`, followed by `s=<source>`,
/// `h=<host>` and `v=<severity code>` in that order.
pub fn derive_keywords(
    tokenizer: &dyn Tokenizer,
    message: &str,
    source: &str,
    host: &str,
    severity: Severity,
    max_keywords: i32,
) -> Vec<String> {
    let mut keywords = tokenizer.tokenize(message, max_keywords);
    keywords.reserve(3);
    keywords.push(format!("s={}", source));
    keywords.push(format!("h={}", host));
    keywords.push(format!("v={}", severity.code()));
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_tokenize_lowercases_and_dedupes() {
        let terms = WordTokenizer.tokenize("Error: disk FULL, error again", 0);
        assert_eq!(terms, vec!["error", "disk", "full", "again"]);
    }

    #[test]
    fn test_tokenize_keeps_joined_tokens() {
        let terms = WordTokenizer.tokenize(
            "login from 10.0.0.1 by ops@example.com on web-01 user_id:42.",
            -1,
        );
        assert_eq!(
            terms,
            vec![
                "login",
                "from",
                "10.0.0.1",
                "by",
                "ops@example.com",
                "on",
                "web-01",
                "user_id:42"
            ]
        );
    }

    #[test]
    fn test_tokenize_respects_budget() {
        let terms = WordTokenizer.tokenize("a b c d e f", 3);
        assert_eq!(terms, vec!["a", "b", "c"]);
        assert!(WordTokenizer.tokenize("   ", 10).is_empty());
    }

    #[test]
    fn test_derive_keywords_suffix() {
        let keywords = derive_keywords(&WordTokenizer, "Hello world", "s1", "h1", Severity::Critical, 100);
        assert_eq!(keywords, vec!["hello", "world", "s=s1", "h=h1", "v=2"]);
    }

    #[quickcheck]
    fn prop_budget_bounds_message_terms(message: String, budget: u8) -> bool {
        let budget = i32::from(budget % 20) + 1;
        let keywords = derive_keywords(&WordTokenizer, &message, "src", "host", Severity::Debug, budget);
        let n = keywords.len();
        n >= 3
            && n - 3 <= budget as usize
            && keywords[n - 3..] == ["s=src", "h=host", "v=7"]
    }
}
