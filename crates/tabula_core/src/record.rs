//! Records returned by repository reads.

use crate::value::{FieldValues, Value};
use chrono::NaiveDate;
use serde::Serialize;

/// One stored row, decoded per its record type's declared field kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    values: FieldValues,
}

impl Record {
    pub fn new(values: FieldValues) -> Self {
        Self { values }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        match self.get(field)? {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        match self.get(field)? {
            Value::Float(value) => Some(*value),
            Value::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        match self.get(field)? {
            Value::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        match self.get(field)? {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn get_date(&self, field: &str) -> Option<NaiveDate> {
        match self.get(field)? {
            Value::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn into_values(self) -> FieldValues {
        self.values
    }
}
