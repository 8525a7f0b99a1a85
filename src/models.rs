use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// RFC 5424 style severity, 0 (most severe) through 7.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Emergency = 0,
    Action = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    #[default]
    Information = 6,
    Debug = 7,
}

impl Severity {
    pub const ALL: [Severity; 8] = [
        Severity::Emergency,
        Severity::Action,
        Severity::Critical,
        Severity::Error,
        Severity::Warning,
        Severity::Notice,
        Severity::Information,
        Severity::Debug,
    ];

    /// Normalize a severity token. Accepts the numeric code or the level name
    /// (case-insensitive); anything else, blank or missing yields `Information`.
    pub fn parse(input: Option<&str>) -> Severity {
        let Some(token) = input.map(str::trim).filter(|t| !t.is_empty()) else {
            return Severity::Information;
        };

        if let Ok(code) = token.parse::<u8>() {
            return Severity::from_code(code).unwrap_or(Severity::Information);
        }

        Severity::ALL
            .iter()
            .copied()
            .find(|severity| severity.name().eq_ignore_ascii_case(token))
            .unwrap_or(Severity::Information)
    }

    pub fn from_code(code: u8) -> Option<Severity> {
        Severity::ALL.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Severity::Emergency => "Emergency",
            Severity::Action => "Action",
            Severity::Critical => "Critical",
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Notice => "Notice",
            Severity::Information => "Information",
            Severity::Debug => "Debug",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed field value, already coerced to the field's declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i32),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Null,
    Array(Vec<FieldValue>),
    Object(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Plain JSON conversion: integers that fit 32 bits become `Integer`,
    /// wider ones `Long`, everything else numeric `Double`.
    pub fn from_json(value: &serde_json::Value) -> FieldValue {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => FieldValue::Integer(small),
                        Err(_) => FieldValue::Long(i),
                    }
                } else {
                    FieldValue::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => FieldValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                FieldValue::Array(items.iter().map(FieldValue::from_json).collect())
            }
            serde_json::Value::Object(map) => FieldValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "string",
            FieldValue::Integer(_) => "integer",
            FieldValue::Long(_) => "long",
            FieldValue::Double(_) => "double",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Date(_) => "date",
            FieldValue::Null => "null",
            FieldValue::Array(_) => "array",
            FieldValue::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::String(s) => serializer.serialize_str(s),
            FieldValue::Integer(i) => serializer.serialize_i32(*i),
            FieldValue::Long(l) => serializer.serialize_i64(*l),
            FieldValue::Double(d) => serializer.serialize_f64(*d),
            FieldValue::Boolean(b) => serializer.serialize_bool(*b),
            FieldValue::Date(dt) => {
                serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Array(items) => items.serialize(serializer),
            FieldValue::Object(map) => map.serialize(serializer),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Long(l) => write!(f, "{}", l),
            FieldValue::Double(d) => write!(f, "{}", d),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Date(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            FieldValue::Null => f.write_str("null"),
            FieldValue::Array(_) | FieldValue::Object(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

/// One inbound log line with its transport metadata, as handed to a parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    /// `yyyy-MM-dd'T'HH:mm:ss.SSS'Z'`, UTC.
    pub timestamp: String,
    pub source: String,
    pub host: String,
    pub severity: String,
    /// Optional JSON object of fields parsed upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
    pub message: String,
}

impl RawEntry {
    pub fn new(
        timestamp: impl Into<String>,
        source: impl Into<String>,
        host: impl Into<String>,
        severity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            source: source.into(),
            host: host.into(),
            severity: severity.into(),
            fields: None,
            message: message.into(),
        }
    }

    pub fn with_fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }
}

/// Normalized entry ready for storage. Ownership passes to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedEntry {
    #[serde(serialize_with = "serialize_millis")]
    pub timestamp: DateTime<Utc>,
    /// Ingestion time.
    #[serde(serialize_with = "serialize_millis")]
    pub saved_timestamp: DateTime<Utc>,
    pub source: String,
    pub host: String,
    pub severity: Severity,
    pub message: String,
    pub keywords: Vec<String>,
    pub fields: BTreeMap<String, FieldValue>,
}

fn serialize_millis<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl ParsedEntry {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    impl Arbitrary for Severity {
        fn arbitrary(g: &mut Gen) -> Self {
            *g.choose(&Severity::ALL).unwrap()
        }
    }

    #[quickcheck]
    fn prop_code_and_name_agree(severity: Severity) -> bool {
        let by_code = Severity::parse(Some(&severity.code().to_string()));
        let by_name = Severity::parse(Some(severity.name()));
        let by_upper = Severity::parse(Some(&severity.name().to_uppercase()));
        by_code == severity && by_name == severity && by_upper == severity
    }

    #[quickcheck]
    fn prop_out_of_range_codes_are_information(code: u16) -> bool {
        code < 8 || Severity::parse(Some(&code.to_string())) == Severity::Information
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse(Some("4")), Severity::Warning);
        assert_eq!(Severity::parse(Some("Warning")), Severity::Warning);
        assert_eq!(Severity::parse(Some("WARNING")), Severity::Warning);
        assert_eq!(Severity::parse(Some("99")), Severity::Information);
        assert_eq!(Severity::parse(Some("-1")), Severity::Information);
        assert_eq!(Severity::parse(Some("  ")), Severity::Information);
        assert_eq!(Severity::parse(Some("loud")), Severity::Information);
        assert_eq!(Severity::parse(None), Severity::Information);
        assert_eq!(Severity::default(), Severity::Information);
    }

    #[test]
    fn test_field_value_from_json() {
        let json: serde_json::Value = serde_json::from_str(
            r#"{"small": 5, "big": 5000000000, "ratio": 0.5, "ok": true, "none": null, "tags": ["a"]}"#,
        )
        .unwrap();
        let FieldValue::Object(map) = FieldValue::from_json(&json) else {
            panic!("expected object");
        };
        assert_eq!(map["small"], FieldValue::Integer(5));
        assert_eq!(map["big"], FieldValue::Long(5_000_000_000));
        assert_eq!(map["ratio"], FieldValue::Double(0.5));
        assert_eq!(map["ok"], FieldValue::Boolean(true));
        assert_eq!(map["none"], FieldValue::Null);
        assert_eq!(map["tags"], FieldValue::Array(vec![FieldValue::String("a".into())]));
    }

    #[test]
    fn test_field_value_serializes_dates_as_rfc3339() {
        let dt = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let json = serde_json::to_string(&FieldValue::Date(dt)).unwrap();
        assert_eq!(json, "\"2024-03-01T10:00:00.000Z\"");
        assert_eq!(serde_json::to_string(&FieldValue::Integer(7)).unwrap(), "7");
    }

    #[test]
    fn test_raw_entry_envelope_deserializes() {
        let raw: RawEntry = serde_json::from_str(
            r#"{"timestamp":"2024-01-01T00:00:00.000Z","source":"app","host":"h1","severity":"3","message":"boom"}"#,
        )
        .unwrap();
        assert_eq!(raw.fields, None);
        assert_eq!(raw.message, "boom");
    }
}
