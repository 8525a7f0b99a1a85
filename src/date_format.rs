//! Configurable date parsing.
//!
//! Formats are written with the `SimpleDateFormat` letters most log shippers
//! already use (`yyyy-MM-dd'T'HH:mm:ssZ`), or as a native strftime string when
//! they contain `%`. A `DateFormat` is compiled once and is safe to share
//! between threads; nothing is mutated while parsing.

use crate::error::{ConfigError, FieldParseError};
use chrono::format::{self, Item, Parsed, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeDelta, TimeZone, Timelike, Utc};

pub const DEFAULT_DATE_FORMAT: &str = "yyyy-MM-dd'T'HH:mm:ssZ";

/// Which calendar/clock components a format supplies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Components {
    year: bool,
    month: bool,
    day: bool,
    ordinal: bool,
    hour24: bool,
    hour12: bool,
    ampm: bool,
    minute: bool,
    second: bool,
    zone: bool,
    timestamp: bool,
}

impl Components {
    fn scan(strftime: &str) -> Self {
        let mut components = Components::default();
        let mut chars = strftime.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                continue;
            }
            let specifier = chars
                .by_ref()
                .find(|next| !matches!(*next, '-' | '_' | '#' | ':' | '.') && !next.is_ascii_digit());
            let Some(specifier) = specifier else { break };
            components.mark(specifier);
        }

        components
    }

    fn mark(&mut self, specifier: char) {
        match specifier {
            'Y' | 'C' | 'y' | 'G' | 'g' => self.year = true,
            'm' | 'b' | 'B' | 'h' => self.month = true,
            'd' | 'e' => self.day = true,
            'j' => self.ordinal = true,
            'H' | 'k' => self.hour24 = true,
            'I' | 'l' => self.hour12 = true,
            'p' | 'P' => self.ampm = true,
            'M' => self.minute = true,
            'S' => self.second = true,
            'z' | 'Z' => self.zone = true,
            's' => self.timestamp = true,
            'F' | 'D' | 'x' => {
                self.year = true;
                self.month = true;
                self.day = true;
            }
            'T' | 'X' => {
                self.hour24 = true;
                self.minute = true;
                self.second = true;
            }
            'R' => {
                self.hour24 = true;
                self.minute = true;
            }
            'r' => {
                self.hour12 = true;
                self.ampm = true;
                self.minute = true;
                self.second = true;
            }
            'c' | '+' => {
                self.mark('F');
                self.mark('T');
                self.zone |= specifier == '+';
            }
            _ => {}
        }
    }

    fn has_any(&self) -> bool {
        self.year
            || self.month
            || self.day
            || self.ordinal
            || self.hour24
            || self.hour12
            || self.timestamp
    }
}

#[derive(Debug, Clone)]
pub struct DateFormat {
    pattern: String,
    strftime: String,
    components: Components,
    /// `%f` holds a `SimpleDateFormat` millisecond count rather than nanoseconds.
    millis: bool,
    timezone: FixedOffset,
}

impl DateFormat {
    /// Compile `pattern`. `timezone` applies to formats that carry no zone of
    /// their own and defaults to UTC.
    pub fn new(pattern: &str, timezone: Option<&str>) -> Result<Self, ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidDateFormat {
            format: pattern.to_string(),
            error_message: message.to_string(),
        };

        let (strftime, millis) = if pattern.contains('%') {
            (pattern.to_string(), false)
        } else {
            translate_pattern(pattern).map_err(|message| invalid(&message))?
        };

        if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
            return Err(invalid("unsupported format specifier"));
        }

        let components = Components::scan(&strftime);
        if !components.has_any() {
            return Err(invalid("format has no date or time component"));
        }

        let timezone = match timezone {
            Some(specifier) => parse_timezone(specifier)?,
            None => Utc.fix(),
        };

        Ok(Self {
            pattern: pattern.to_string(),
            strftime,
            components,
            millis,
            timezone,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn parse(&self, value: &str) -> Result<DateTime<Utc>, FieldParseError> {
        let error = || FieldParseError::InvalidDate {
            input: value.to_string(),
            format: self.pattern.clone(),
        };

        let trimmed = value.trim();
        // A trailing 'Z' designator means UTC; zone specifiers only take numeric offsets.
        let rewritten;
        let input = match trimmed.strip_suffix('Z') {
            Some(head) if self.components.zone => {
                rewritten = format!("{}+0000", head);
                rewritten.as_str()
            }
            _ => trimmed,
        };

        let mut parsed = Parsed::new();
        format::parse(&mut parsed, input, StrftimeItems::new(&self.strftime)).map_err(|_| error())?;
        self.resolve(parsed).ok_or_else(error)
    }

    /// Fill the components the format does not supply (1970-01-01 00:00:00)
    /// and apply the zone.
    fn resolve(&self, mut parsed: Parsed) -> Option<DateTime<Utc>> {
        let c = &self.components;

        if c.timestamp {
            let naive = parsed.to_naive_datetime_with_offset(0).ok()?;
            return Some(Utc.from_utc_datetime(&naive));
        }

        if !c.year {
            parsed.set_year(1970).ok()?;
        }
        if !c.ordinal {
            if !c.month {
                parsed.set_month(1).ok()?;
            }
            if !c.day {
                parsed.set_day(1).ok()?;
            }
        }
        if c.hour12 && !c.ampm {
            parsed.set_ampm(false).ok()?;
        }
        if !c.hour24 && !c.hour12 {
            parsed.set_hour(0).ok()?;
        }
        if !c.minute {
            parsed.set_minute(0).ok()?;
        }
        if !c.second {
            parsed.set_second(0).ok()?;
        }

        let date = parsed.to_naive_date().ok()?;
        let time = parsed.to_naive_time().ok()?;
        let naive = match parsed.nanosecond().filter(|_| self.millis) {
            Some(count) => NaiveDateTime::new(date, time.with_nanosecond(0)?)
                .checked_add_signed(TimeDelta::try_milliseconds(i64::from(count))?)?,
            None => NaiveDateTime::new(date, time),
        };

        let offset = if c.zone {
            parsed.to_fixed_offset().ok()?
        } else {
            self.timezone
        };

        offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Translate `SimpleDateFormat` letters into a strftime string. The flag is
/// set when the pattern reads milliseconds.
fn translate_pattern(pattern: &str) -> Result<(String, bool), String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut millis = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            let mut j = i + 1;
            loop {
                match chars.get(j) {
                    None => return Err("unterminated quoted literal".to_string()),
                    Some('\'') if chars.get(j + 1) == Some(&'\'') => {
                        out.push('\'');
                        j += 2;
                    }
                    Some('\'') => break,
                    Some(&literal) => {
                        push_literal(&mut out, literal);
                        j += 1;
                    }
                }
            }
            i = j + 1;
            continue;
        }

        if c.is_ascii_alphabetic() {
            let mut run = 1;
            while chars.get(i + run) == Some(&c) {
                run += 1;
            }
            out.push_str(pattern_letter(c, run)?);
            millis |= c == 'S';
            i += run;
            continue;
        }

        push_literal(&mut out, c);
        i += 1;
    }

    Ok((out, millis))
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

fn pattern_letter(letter: char, run: usize) -> Result<&'static str, String> {
    let specifier = match letter {
        'y' if run == 2 => "%y",
        'y' => "%Y",
        'M' | 'L' if run <= 2 => "%m",
        'M' | 'L' if run == 3 => "%b",
        'M' | 'L' => "%B",
        'd' => "%d",
        'D' => "%j",
        'H' | 'k' => "%H",
        'h' | 'K' => "%I",
        'm' => "%M",
        's' => "%S",
        'S' => "%f",
        'a' => "%p",
        'E' if run <= 3 => "%a",
        'E' => "%A",
        'u' => "%u",
        'Z' | 'X' | 'z' => "%z",
        other => return Err(format!("unsupported pattern letter '{}'", other)),
    };
    Ok(specifier)
}

/// Parse a fixed-offset zone: `UTC`, `GMT`, `Z`, `+02:00`, `-0530`, `GMT+2`, ...
pub fn parse_timezone(specifier: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::InvalidTimezone(specifier.to_string());
    let upper = specifier.trim().to_ascii_uppercase();

    if matches!(upper.as_str(), "UTC" | "GMT" | "UT" | "Z") {
        return Ok(Utc.fix());
    }

    let offset = upper
        .strip_prefix("UTC")
        .or_else(|| upper.strip_prefix("GMT"))
        .unwrap_or(&upper);

    let (sign, digits) = if let Some(rest) = offset.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = offset.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };

    let (hours, minutes) = match digits.split_once(':') {
        Some(parts) => parts,
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };

    let numeric = |s: &str| -> Option<i32> {
        if s.is_empty() || s.len() > 2 || !s.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    };

    let hours = numeric(hours).filter(|h| *h <= 18).ok_or_else(invalid)?;
    let minutes = numeric(minutes).filter(|m| *m <= 59).ok_or_else(invalid)?;

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
