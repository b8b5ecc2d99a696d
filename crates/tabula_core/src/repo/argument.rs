//! Loosely typed criteria argument accepted by repository methods.
//!
//! Calling layers (HTTP handlers, scripting bridges) hand over whatever they
//! decoded. Only "nothing" and a criteria set are acceptable; everything else
//! is rejected with `RepoError::InvalidCriteriaType` naming what was found.

use super::{RepoError, RepoResult};
use crate::criteria::{CriteriaError, CriteriaSet};
use crate::value::{FieldValues, Value};
use chrono::NaiveDate;
use serde_json::Value as JsonValue;

/// Criteria argument as received from the caller.
#[derive(Debug, Clone, Default)]
pub enum CriteriaArg {
    #[default]
    Absent,
    Set(CriteriaSet),
    Scalar(Value),
    Json(JsonValue),
}

impl CriteriaArg {
    /// Type-checks the argument and substitutes an empty set when absent.
    ///
    /// # Errors
    /// - `InvalidCriteriaType` for scalars and non-object JSON.
    /// - `Criteria(UnsupportedValue)` for JSON objects holding arrays/objects.
    pub fn resolve(self) -> RepoResult<CriteriaSet> {
        match self {
            Self::Absent => Ok(CriteriaSet::new()),
            Self::Set(criteria) => Ok(criteria),
            Self::Scalar(value) => Err(RepoError::InvalidCriteriaType {
                found: value.kind().to_string(),
            }),
            Self::Json(JsonValue::Null) => Ok(CriteriaSet::new()),
            Self::Json(JsonValue::Object(object)) => {
                let mut fields = FieldValues::new();
                for (name, value) in object {
                    let value = json_scalar(&name, value)?;
                    fields.insert(name, value);
                }
                Ok(CriteriaSet::from_fields(fields))
            }
            Self::Json(other) => Err(RepoError::InvalidCriteriaType {
                found: json_type_name(&other).to_string(),
            }),
        }
    }
}

fn json_scalar(field: &str, value: JsonValue) -> Result<Value, CriteriaError> {
    match value {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(value) => Ok(Value::Boolean(value)),
        JsonValue::Number(number) => match number.as_i64() {
            Some(value) => Ok(Value::Integer(value)),
            None => Ok(Value::Float(number.as_f64().unwrap_or(f64::NAN))),
        },
        JsonValue::String(value) => Ok(Value::Text(value)),
        other => Err(CriteriaError::UnsupportedValue {
            field: field.to_string(),
            found: json_type_name(&other),
        }),
    }
}

/// Names JSON values with the `ValueKind` vocabulary where one applies.
fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(number) if number.is_i64() || number.is_u64() => "integer",
        JsonValue::Number(_) => "float",
        JsonValue::String(_) => "text",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

impl From<CriteriaSet> for CriteriaArg {
    fn from(value: CriteriaSet) -> Self {
        Self::Set(value)
    }
}

impl From<Option<CriteriaSet>> for CriteriaArg {
    fn from(value: Option<CriteriaSet>) -> Self {
        value.map_or(Self::Absent, Self::Set)
    }
}

impl From<JsonValue> for CriteriaArg {
    fn from(value: JsonValue) -> Self {
        Self::Json(value)
    }
}

impl From<Value> for CriteriaArg {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}

macro_rules! scalar_criteria_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for CriteriaArg {
                fn from(value: $ty) -> Self {
                    Self::Scalar(Value::from(value))
                }
            }
        )*
    };
}

scalar_criteria_arg!(i64, i32, f64, bool, String, &str, NaiveDate);
