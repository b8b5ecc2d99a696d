//! Equality criteria and the predicates they expand into.
//!
//! # Responsibility
//! - Hold named equality constraints independent of any record type.
//! - Resolve constraints against a bound `RecordType` into `Predicate`s.
//!
//! # Invariants
//! - Construction never consults a schema; unknown names surface only when
//!   predicates are produced.
//! - Every `predicates()` call yields a fresh traversal in insertion order.
//!   A bound set never hands out a shared, exhaustible cursor.
//! - All predicates of one set are AND-combined; order never changes results.

use crate::schema::{Field, RecordType};
use crate::value::{FieldValues, Value, ValueKind};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Error raised while binding criteria or field values to a record type.
#[derive(Debug, Clone, PartialEq)]
pub enum CriteriaError {
    /// Predicates were requested before `bind`.
    UnboundModel,
    UnknownField {
        record_type: String,
        field: String,
    },
    ValueKindMismatch {
        field: String,
        expected: ValueKind,
        found: ValueKind,
    },
    /// Loosely typed input carried a non-scalar value (array/object).
    UnsupportedValue {
        field: String,
        found: &'static str,
    },
}

impl Display for CriteriaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnboundModel => {
                write!(f, "criteria are not bound to a record type; call `bind` first")
            }
            Self::UnknownField { record_type, field } => {
                write!(f, "record type `{record_type}` has no field `{field}`")
            }
            Self::ValueKindMismatch {
                field,
                expected,
                found,
            } => write!(f, "field `{field}` expects {expected} value, got {found}"),
            Self::UnsupportedValue { field, found } => {
                write!(f, "field `{field}` requires a scalar value, got {found}")
            }
        }
    }
}

impl Error for CriteriaError {}

/// One resolved equality comparison (`field = value`).
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    field: String,
    kind: ValueKind,
    value: Value,
}

impl Predicate {
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Declared kind of the compared field.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Comparison operand, already coerced to the field kind.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// SQL fragment using one positional placeholder, or none for `IS NULL`.
    pub fn to_sql(&self) -> String {
        if self.value.is_null() {
            format!("\"{}\" IS NULL", self.field)
        } else {
            format!("\"{}\" = ?", self.field)
        }
    }

    /// Bind parameter for [`Predicate::to_sql`], if it needs one.
    pub fn bind_value(&self) -> Option<&Value> {
        (!self.value.is_null()).then_some(&self.value)
    }

    /// Evaluates the comparison against a stored cell.
    pub fn matches(&self, stored: Option<&Value>) -> bool {
        match stored {
            None => self.value.is_null(),
            Some(stored) => stored == &self.value,
        }
    }
}

/// Named equality constraints, bound lazily to a record type.
#[derive(Debug, Clone, Default)]
pub struct CriteriaSet {
    fields: FieldValues,
    record_type: Option<Arc<RecordType>>,
}

impl CriteriaSet {
    /// Empty set; matches every record once bound.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: FieldValues) -> Self {
        Self {
            fields,
            record_type: None,
        }
    }

    /// Adds (or replaces) one constraint, builder style.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field, value)
    }

    pub fn fields(&self) -> &FieldValues {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Attaches (or replaces) the record type predicates resolve against.
    pub fn bind(&mut self, record_type: Arc<RecordType>) -> &mut Self {
        self.record_type = Some(record_type);
        self
    }

    /// Owned form of [`CriteriaSet::bind`].
    pub fn bound(mut self, record_type: Arc<RecordType>) -> Self {
        self.bind(record_type);
        self
    }

    pub fn record_type(&self) -> Option<&RecordType> {
        self.record_type.as_deref()
    }

    /// Lazily resolves every constraint into a predicate.
    ///
    /// # Errors
    /// - `UnboundModel` when no record type is bound.
    /// - Items fail with `UnknownField` / `ValueKindMismatch` for constraints
    ///   the bound record type cannot satisfy.
    pub fn predicates(
        &self,
    ) -> Result<impl Iterator<Item = Result<Predicate, CriteriaError>> + '_, CriteriaError> {
        let record_type = self
            .record_type
            .as_deref()
            .ok_or(CriteriaError::UnboundModel)?;

        Ok(self
            .fields
            .iter()
            .map(move |(name, value)| resolve_predicate(record_type, name, value)))
    }

    /// Resolves all predicates, stopping at the first failure.
    pub fn collect_predicates(&self) -> Result<Vec<Predicate>, CriteriaError> {
        self.predicates()?.collect()
    }
}

impl From<FieldValues> for CriteriaSet {
    fn from(fields: FieldValues) -> Self {
        Self::from_fields(fields)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for CriteriaSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_fields(iter.into_iter().collect())
    }
}

fn resolve_predicate(
    record_type: &RecordType,
    name: &str,
    value: &Value,
) -> Result<Predicate, CriteriaError> {
    let field = resolve_field(record_type, name)?;
    let value = coerce_for_field(field, value.clone())?;
    Ok(Predicate {
        field: field.name().to_string(),
        kind: field.kind(),
        value,
    })
}

/// Looks up `name` on `record_type`, failing with `UnknownField`.
pub(crate) fn resolve_field<'r>(
    record_type: &'r RecordType,
    name: &str,
) -> Result<&'r Field, CriteriaError> {
    record_type
        .field(name)
        .ok_or_else(|| CriteriaError::UnknownField {
            record_type: record_type.name().to_string(),
            field: name.to_string(),
        })
}

/// Converts `value` into the representation stored for `field`.
pub(crate) fn coerce_for_field(field: &Field, value: Value) -> Result<Value, CriteriaError> {
    value
        .coerce_to(field.kind())
        .map_err(|found| CriteriaError::ValueKindMismatch {
            field: field.name().to_string(),
            expected: field.kind(),
            found: found.kind(),
        })
}
