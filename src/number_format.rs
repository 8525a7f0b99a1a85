//! Pattern-driven number parsing for `number_format` properties.
//!
//! Patterns use the familiar `DecimalFormat` syntax: `#,##0.00`, `0.###E0`,
//! `'USD '#,##0`, `#%`, `#,##0;(#,##0)`. Only parsing is supported. Parsing is
//! lenient in the same way: the prefix must match, the longest numeric run is
//! consumed, the suffix must match and anything after it is ignored.

use crate::error::{ConfigError, FieldParseError};

/// Result of a successful parse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Long(i64),
    Double(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Long(l) => l as f64,
            Number::Double(d) => d,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberFormat {
    pattern: String,
    positive_prefix: String,
    positive_suffix: String,
    negative_prefix: String,
    negative_suffix: String,
    multiplier: u32,
    grouping: bool,
}

#[derive(Debug, Default)]
struct Affixes {
    prefix: String,
    suffix: String,
    multiplier: Option<u32>,
    grouping: bool,
    has_digits: bool,
}

#[derive(PartialEq)]
enum Section {
    Prefix,
    Number,
    Suffix,
}

fn is_number_char(c: char) -> bool {
    matches!(c, '#' | '0'..='9' | ',' | '.')
}

impl NumberFormat {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidNumberFormat {
            format: pattern.to_string(),
            error_message: message,
        };

        let (positive, negative) = split_subpatterns(pattern);
        let positive = parse_subpattern(positive).map_err(invalid)?;
        if !positive.has_digits {
            return Err(invalid("pattern has no digit placeholders".to_string()));
        }

        let (negative_prefix, negative_suffix) = match negative {
            Some(negative) => {
                let negative = parse_subpattern(negative).map_err(invalid)?;
                (negative.prefix, negative.suffix)
            }
            None => (format!("-{}", positive.prefix), positive.suffix.clone()),
        };

        Ok(Self {
            pattern: pattern.to_string(),
            positive_prefix: positive.prefix,
            positive_suffix: positive.suffix,
            negative_prefix,
            negative_suffix,
            multiplier: positive.multiplier.unwrap_or(1),
            grouping: positive.grouping,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn parse(&self, text: &str) -> Result<Number, FieldParseError> {
        let invalid = || FieldParseError::InvalidNumber {
            input: text.to_string(),
            expected: "number",
        };

        let positive = text.strip_prefix(self.positive_prefix.as_str());
        let negative = text.strip_prefix(self.negative_prefix.as_str());

        // The longer matching prefix wins, positive on a tie.
        let (is_negative, body) = match (positive, negative) {
            (Some(p), Some(n)) if n.len() < p.len() => (true, n),
            (Some(p), _) => (false, p),
            (None, Some(n)) => (true, n),
            (None, None) => return Err(invalid()),
        };

        let (digits, consumed) = self.scan_number(body).ok_or_else(invalid)?;
        let suffix = if is_negative {
            &self.negative_suffix
        } else {
            &self.positive_suffix
        };
        if !body[consumed..].starts_with(suffix.as_str()) {
            return Err(invalid());
        }

        let number = to_number(&digits, is_negative, self.multiplier).ok_or_else(invalid)?;
        Ok(number)
    }

    /// Longest numeric run at the start of `body`, with grouping separators
    /// removed. Returns the normalized text and the byte length consumed.
    fn scan_number(&self, body: &str) -> Option<(String, usize)> {
        let bytes = body.as_bytes();
        let mut normalized = String::new();
        let mut seen_digit = false;
        let mut seen_point = false;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'0'..=b'9' => {
                    normalized.push(bytes[i] as char);
                    seen_digit = true;
                }
                b',' if self.grouping && seen_digit && !seen_point => {}
                b'.' if !seen_point => {
                    normalized.push('.');
                    seen_point = true;
                }
                _ => break,
            }
            i += 1;
        }

        if !seen_digit {
            return None;
        }

        // Exponent only counts when digits follow.
        if i < bytes.len() && bytes[i] == b'E' {
            let mut j = i + 1;
            let mut exponent = String::from("e");
            if j < bytes.len() && (bytes[j] == b'-' || bytes[j] == b'+') {
                exponent.push(bytes[j] as char);
                j += 1;
            }
            let start = j;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                exponent.push(bytes[j] as char);
                j += 1;
            }
            if j > start {
                normalized.push_str(&exponent);
                i = j;
            }
        }

        Some((normalized, i))
    }
}

fn to_number(digits: &str, negative: bool, multiplier: u32) -> Option<Number> {
    let plain_integer = !digits.contains(['.', 'e']);

    if plain_integer {
        if let Ok(mut value) = digits.parse::<i64>() {
            if negative {
                value = -value;
            }
            let multiplier = i64::from(multiplier);
            if value % multiplier == 0 {
                return Some(Number::Long(value / multiplier));
            }
            return Some(Number::Double(value as f64 / multiplier as f64));
        }
    }

    let mut value: f64 = digits.parse().ok()?;
    if negative {
        value = -value;
    }
    value /= f64::from(multiplier);

    if value.fract() == 0.0 && value.abs() < 9.007_199_254_740_992e15 {
        Some(Number::Long(value as i64))
    } else {
        Some(Number::Double(value))
    }
}

/// Split on the first unquoted `;`.
fn split_subpatterns(pattern: &str) -> (&str, Option<&str>) {
    let mut quoted = false;
    for (i, c) in pattern.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            ';' if !quoted => return (&pattern[..i], Some(&pattern[i + 1..])),
            _ => {}
        }
    }
    (pattern, None)
}

fn parse_subpattern(pattern: &str) -> Result<Affixes, String> {
    let mut affixes = Affixes::default();
    let mut section = Section::Prefix;
    let mut chars = pattern.chars().peekable();
    let mut seen_point = false;

    while let Some(c) = chars.next() {
        if section == Section::Number && !is_number_char(c) && c != 'E' {
            section = Section::Suffix;
        }

        if section != Section::Number && c == '\'' {
            let target = if section == Section::Prefix {
                &mut affixes.prefix
            } else {
                &mut affixes.suffix
            };
            if chars.peek() == Some(&'\'') {
                chars.next();
                target.push('\'');
                continue;
            }
            loop {
                match chars.next() {
                    None => return Err("unterminated quote".to_string()),
                    Some('\'') if chars.peek() == Some(&'\'') => {
                        chars.next();
                        target.push('\'');
                    }
                    Some('\'') => break,
                    Some(literal) => target.push(literal),
                }
            }
            continue;
        }

        match section {
            Section::Prefix if is_number_char(c) => {
                section = Section::Number;
                number_char(c, &mut affixes, &mut seen_point)?;
            }
            Section::Number if c == 'E' => {
                let mut exponent_digits = 0;
                while chars.peek() == Some(&'0') {
                    chars.next();
                    exponent_digits += 1;
                }
                if exponent_digits == 0 {
                    return Err("exponent requires at least one '0'".to_string());
                }
                section = Section::Suffix;
            }
            Section::Number => number_char(c, &mut affixes, &mut seen_point)?,
            Section::Suffix if is_number_char(c) => {
                return Err(format!("unquoted special character '{}' in suffix", c));
            }
            _ => {
                match c {
                    '%' => set_multiplier(&mut affixes.multiplier, 100)?,
                    '\u{2030}' => set_multiplier(&mut affixes.multiplier, 1000)?,
                    _ => {}
                }
                let target = if section == Section::Prefix {
                    &mut affixes.prefix
                } else {
                    &mut affixes.suffix
                };
                target.push(c);
            }
        }
    }

    Ok(affixes)
}

fn number_char(c: char, affixes: &mut Affixes, seen_point: &mut bool) -> Result<(), String> {
    match c {
        ',' => affixes.grouping = true,
        '.' if *seen_point => return Err("multiple decimal separators".to_string()),
        '.' => *seen_point = true,
        _ => affixes.has_digits = true,
    }
    Ok(())
}

fn set_multiplier(slot: &mut Option<u32>, value: u32) -> Result<(), String> {
    if slot.is_some() {
        return Err("too many percent/per-mille characters".to_string());
    }
    *slot = Some(value);
    Ok(())
}
