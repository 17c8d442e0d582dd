//! Scalar values carried by filter leaves and read out of records.
//!
//! [`Value`] is the owned form stored in a [`FilterDescriptor`](crate::FilterDescriptor).
//! [`ValueRef`] is the borrowed form a record hands to a compiled predicate.
//! Leaf values are coerced to the declared [`ValueKind`] of the field they are
//! compared against, so `"42"` typed into a UI text box can still filter an
//! integer column.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Format used when a date value is rendered into query text.
pub const LITERAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats accepted when coercing text into a date value.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// The declared kind of a scalar record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    DateTime,
    Guid,
}

impl ValueKind {
    /// Returns true if values of this kind support `<`, `<=`, `>`, `>=`.
    pub fn is_orderable(self) -> bool {
        matches!(
            self,
            ValueKind::Int | ValueKind::Float | ValueKind::Text | ValueKind::DateTime
        )
    }

    /// Returns a human-readable name for error messages.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "integer",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::DateTime => "datetime",
            ValueKind::Guid => "guid",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An owned scalar value.
///
/// Deserializes untagged from JSON scalars. Strings always deserialize as
/// [`Value::Text`]; they become dates or GUIDs only when coerced against a
/// field of that kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Guid(Uuid),
}

impl Value {
    /// Returns the kind of this value, or `None` for [`Value::Null`].
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Int(_) => Some(ValueKind::Int),
            Value::Float(_) => Some(ValueKind::Float),
            Value::Text(_) => Some(ValueKind::Text),
            Value::DateTime(_) => Some(ValueKind::DateTime),
            Value::Guid(_) => Some(ValueKind::Guid),
        }
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the text payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts this value to the given kind.
    ///
    /// Returns `None` when the value cannot represent the kind: `"abc"` as an
    /// integer, `1.5` as an integer, a GUID as a date, and so on.
    pub fn coerce(&self, kind: ValueKind) -> Option<Value> {
        match (self, kind) {
            (Value::Null, _) => None,
            (Value::Bool(b), ValueKind::Bool) => Some(Value::Bool(*b)),
            (Value::Int(i), ValueKind::Int) => Some(Value::Int(*i)),
            (Value::Int(i), ValueKind::Float) => Some(Value::Float(*i as f64)),
            (Value::Float(f), ValueKind::Float) => Some(Value::Float(*f)),
            (Value::Float(f), ValueKind::Int) => {
                if f.fract() == 0.0 && f.is_finite() {
                    Some(Value::Int(*f as i64))
                } else {
                    None
                }
            }
            (Value::DateTime(d), ValueKind::DateTime) => Some(Value::DateTime(*d)),
            (Value::Guid(g), ValueKind::Guid) => Some(Value::Guid(*g)),
            (Value::Guid(g), ValueKind::Text) => Some(Value::Text(g.to_string())),
            (Value::Text(s), ValueKind::Text) => Some(Value::Text(s.clone())),
            (Value::Text(s), kind) => parse_text(s.trim(), kind),
            (Value::Bool(_) | Value::Int(_) | Value::Float(_), ValueKind::Text) => {
                Some(Value::Text(self.to_string()))
            }
            _ => None,
        }
    }

    /// Renders this value as a literal of the textual query grammar.
    ///
    /// Text is double-quoted with `\` and `"` escaped.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => quote(s),
            Value::DateTime(d) => format!(
                "DateTime.Parse({})",
                quote(&d.format(LITERAL_DATETIME_FORMAT).to_string())
            ),
            Value::Guid(g) => quote(&g.to_string()),
        }
    }
}

impl Value {
    /// Total order used when sorting records locally.
    ///
    /// `Null` sorts before everything. Integers and floats compare across
    /// kinds; any other kind mismatch compares equal.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Guid(a), Value::Guid(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Wraps `s` in double quotes, escaping backslashes and quotes.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn parse_text(s: &str, kind: ValueKind) -> Option<Value> {
    match kind {
        ValueKind::Bool => match s.to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        ValueKind::Int => s.parse::<i64>().ok().map(Value::Int),
        ValueKind::Float => s.parse::<f64>().ok().map(Value::Float),
        ValueKind::DateTime => parse_datetime(s).map(Value::DateTime),
        ValueKind::Guid => Uuid::parse_str(s).ok().map(Value::Guid),
        ValueKind::Text => Some(Value::Text(s.to_string())),
    }
}

/// Parses the date formats accepted in filter values.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::DateTime(d) => write!(f, "{}", d.format(LITERAL_DATETIME_FORMAT)),
            Value::Guid(g) => write!(f, "{g}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::DateTime(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::DateTime(d.and_time(NaiveTime::MIN))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::DateTime(d.naive_utc())
    }
}

impl From<Uuid> for Value {
    fn from(g: Uuid) -> Self {
        Value::Guid(g)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A scalar borrowed from a record during predicate evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRef<'a> {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(&'a str),
    DateTime(NaiveDateTime),
    Guid(Uuid),
}

impl ValueRef<'_> {
    /// Compares a record value against a leaf operand of the same kind.
    ///
    /// Integers and floats compare across kinds. Every other kind mismatch
    /// returns `None`, which compiled predicates treat as "does not match".
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (ValueRef::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (ValueRef::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (ValueRef::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (ValueRef::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (ValueRef::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (ValueRef::Text(a), Value::Text(b)) => Some((*a).cmp(b.as_str())),
            (ValueRef::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (ValueRef::Guid(a), Value::Guid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Converts to an owned [`Value`].
    pub fn to_owned_value(&self) -> Value {
        match self {
            ValueRef::Bool(b) => Value::Bool(*b),
            ValueRef::Int(i) => Value::Int(*i),
            ValueRef::Float(f) => Value::Float(*f),
            ValueRef::Text(s) => Value::Text((*s).to_string()),
            ValueRef::DateTime(d) => Value::DateTime(*d),
            ValueRef::Guid(g) => Value::Guid(*g),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_text_to_int() {
        let value = Value::from("42");
        assert_eq!(value.coerce(ValueKind::Int), Some(Value::Int(42)));
        assert_eq!(Value::from("4x2").coerce(ValueKind::Int), None);
    }

    #[test]
    fn test_coerce_int_widens_to_float() {
        assert_eq!(Value::Int(3).coerce(ValueKind::Float), Some(Value::Float(3.0)));
    }

    #[test]
    fn test_coerce_fractional_float_does_not_narrow() {
        assert_eq!(Value::Float(1.5).coerce(ValueKind::Int), None);
        assert_eq!(Value::Float(2.0).coerce(ValueKind::Int), Some(Value::Int(2)));
    }

    #[test]
    fn test_coerce_text_to_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        for input in [
            "2024-03-09 14:30:00",
            "2024-03-09T14:30:00",
            "2024-03-09T14:30:00Z",
        ] {
            assert_eq!(
                Value::from(input).coerce(ValueKind::DateTime),
                Some(Value::DateTime(expected)),
                "input: {input}"
            );
        }
        assert_eq!(
            Value::from("2024-03-09").coerce(ValueKind::DateTime),
            Some(Value::DateTime(
                NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_time(NaiveTime::MIN)
            ))
        );
    }

    #[test]
    fn test_coerce_text_to_guid() {
        let id = Uuid::new_v4();
        assert_eq!(
            Value::from(id.to_string()).coerce(ValueKind::Guid),
            Some(Value::Guid(id))
        );
        assert_eq!(Value::from("not-a-guid").coerce(ValueKind::Guid), None);
    }

    #[test]
    fn test_null_never_coerces() {
        assert_eq!(Value::Null.coerce(ValueKind::Text), None);
    }

    #[test]
    fn test_literal_escapes_quotes_and_backslashes() {
        let value = Value::from(r#"say "hi" \o/"#);
        assert_eq!(value.to_literal(), r#""say \"hi\" \\o/""#);
    }

    #[test]
    fn test_literal_forms() {
        assert_eq!(Value::Int(100).to_literal(), "100");
        assert_eq!(Value::Float(2.5).to_literal(), "2.5");
        assert_eq!(Value::Bool(true).to_literal(), "true");
        assert_eq!(Value::Null.to_literal(), "null");
        let date = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(
            Value::DateTime(date).to_literal(),
            r#"DateTime.Parse("2024-01-02 03:04:05")"#
        );
    }

    #[test]
    fn test_deserialize_untagged_scalars() {
        let values: Vec<Value> =
            serde_json::from_str(r#"[null, true, 7, 1.25, "Norte"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(7),
                Value::Float(1.25),
                Value::from("Norte"),
            ]
        );
    }

    #[test]
    fn test_sort_cmp_puts_null_first() {
        let mut values = vec![Value::Int(3), Value::Null, Value::Float(1.5)];
        values.sort_by(Value::sort_cmp);
        assert_eq!(values, vec![Value::Null, Value::Float(1.5), Value::Int(3)]);
    }

    #[test]
    fn test_compare_int_against_float() {
        assert_eq!(
            ValueRef::Int(3).compare(&Value::Float(2.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(ValueRef::Text("a").compare(&Value::Int(1)), None);
    }
}
