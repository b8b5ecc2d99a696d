//! Scalar values exchanged between callers, criteria and the store.
//!
//! # Responsibility
//! - Define the closed set of comparable scalar kinds a store column can hold.
//! - Provide an ordered field-name -> value mapping for inserts, updates and
//!   criteria.
//!
//! # Invariants
//! - `FieldValues` keys are unique; re-inserting a key replaces the value in
//!   place and keeps the original position.
//! - Dates are persisted as ISO-8601 text (`YYYY-MM-DD`).

use chrono::NaiveDate;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// Storage format for `Value::Date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Kind tag for a `Value` or a declared record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Null,
    Integer,
    Float,
    Text,
    Boolean,
    Date,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality-comparable scalar accepted by criteria and field updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Date(_) => ValueKind::Date,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts this value into the representation of a column of `kind`.
    ///
    /// Integers widen to floats and ISO date text parses into dates; `Null`
    /// fits every kind. Returns the original value unchanged on failure so the
    /// caller can report what it found.
    pub fn coerce_to(self, kind: ValueKind) -> Result<Value, Value> {
        match (self, kind) {
            (Self::Null, _) => Ok(Self::Null),
            (Self::Integer(value), ValueKind::Float) => Ok(Self::Float(value as f64)),
            (Self::Text(text), ValueKind::Date) => {
                NaiveDate::parse_from_str(&text, DATE_FORMAT)
                    .map(Self::Date)
                    .map_err(|_| Self::Text(text))
            }
            (value, kind) if value.kind() == kind => Ok(value),
            (value, _) => Err(value),
        }
    }

    /// Decodes a raw SQLite cell stored for a column of `kind`.
    pub fn from_sql(kind: ValueKind, raw: SqlValue) -> Result<Value, String> {
        match (kind, raw) {
            (_, SqlValue::Null) => Ok(Self::Null),
            (ValueKind::Integer, SqlValue::Integer(value)) => Ok(Self::Integer(value)),
            (ValueKind::Float, SqlValue::Real(value)) => Ok(Self::Float(value)),
            (ValueKind::Float, SqlValue::Integer(value)) => Ok(Self::Float(value as f64)),
            (ValueKind::Text, SqlValue::Text(value)) => Ok(Self::Text(value)),
            (ValueKind::Boolean, SqlValue::Integer(0)) => Ok(Self::Boolean(false)),
            (ValueKind::Boolean, SqlValue::Integer(1)) => Ok(Self::Boolean(true)),
            (ValueKind::Date, SqlValue::Text(value)) => {
                NaiveDate::parse_from_str(&value, DATE_FORMAT)
                    .map(Self::Date)
                    .map_err(|_| format!("invalid date `{value}`"))
            }
            (kind, other) => Err(format!(
                "cannot decode {} cell as {kind}",
                sql_type_name(&other)
            )),
        }
    }
}

fn sql_type_name(value: &SqlValue) -> &'static str {
    match value {
        SqlValue::Null => "NULL",
        SqlValue::Integer(_) => "INTEGER",
        SqlValue::Real(_) => "REAL",
        SqlValue::Text(_) => "TEXT",
        SqlValue::Blob(_) => "BLOB",
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Date(value) => write!(f, "{}", value.format(DATE_FORMAT)),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(SqlValue::Null),
            Self::Integer(value) => ToSqlOutput::Owned(SqlValue::Integer(*value)),
            Self::Float(value) => ToSqlOutput::Owned(SqlValue::Real(*value)),
            Self::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
            Self::Boolean(value) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*value))),
            Self::Date(value) => {
                ToSqlOutput::Owned(SqlValue::Text(value.format(DATE_FORMAT).to_string()))
            }
        })
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Ordered field-name -> value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues {
    entries: Vec<(String, Value)>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces `name`, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Builder form of [`FieldValues::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.entries.iter().map(|(_, value)| value)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

impl IntoIterator for FieldValues {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for FieldValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldValues, Value, ValueKind};
    use chrono::NaiveDate;

    #[test]
    fn insert_replaces_existing_key_in_place() {
        let mut fields = FieldValues::new().with("wt", 1).with("fe", 2);
        let previous = fields.insert("wt", 5);

        assert_eq!(previous, Some(Value::Integer(1)));
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["wt", "fe"]);
        assert_eq!(fields.get("wt"), Some(&Value::Integer(5)));
    }

    #[test]
    fn coerce_widens_integer_and_parses_dates() {
        assert_eq!(Value::from(3).coerce_to(ValueKind::Float), Ok(Value::Float(3.0)));
        assert_eq!(
            Value::from("2024-02-29").coerce_to(ValueKind::Date),
            Ok(Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
        assert_eq!(Value::Null.coerce_to(ValueKind::Boolean), Ok(Value::Null));
        assert_eq!(
            Value::from("abc").coerce_to(ValueKind::Integer),
            Err(Value::from("abc"))
        );
    }

    #[test]
    fn from_sql_rejects_out_of_range_boolean() {
        let err = Value::from_sql(ValueKind::Boolean, rusqlite::types::Value::Integer(7))
            .unwrap_err();
        assert!(err.contains("boolean"));
    }

    #[test]
    fn serializes_as_plain_json_map() {
        let fields = FieldValues::new()
            .with("wt", 1)
            .with("name", "ore")
            .with("sampled_on", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .with("note", Value::Null);
        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(
            json,
            r#"{"wt":1,"name":"ore","sampled_on":"2024-01-02","note":null}"#
        );
    }
}
