//! Record type descriptors consumed by criteria and repositories.
//!
//! # Responsibility
//! - Describe one storable record type: table name, primary key and the
//!   declared kind of every field.
//! - Answer the only schema question the core asks: does this field exist.
//!
//! # Invariants
//! - Table and field names are plain SQL identifiers, so they can be quoted
//!   into generated statements without escaping.
//! - Exactly one field is the primary key; field names are unique.
//! - Descriptors are immutable once built and shared through `Arc`.

use crate::value::ValueKind;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Error raised while assembling a `RecordType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    InvalidIdentifier(String),
    NullKind { record_type: String, field: String },
    DuplicateField { record_type: String, field: String },
    MissingPrimaryKey(String),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(name) => write!(f, "invalid identifier `{name}`"),
            Self::NullKind { record_type, field } => {
                write!(f, "field `{record_type}.{field}` cannot be declared with kind null")
            }
            Self::DuplicateField { record_type, field } => {
                write!(f, "field `{field}` declared twice on `{record_type}`")
            }
            Self::MissingPrimaryKey(record_type) => {
                write!(f, "record type `{record_type}` has no primary key")
            }
        }
    }
}

impl Error for SchemaError {}

/// One declared field of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    kind: ValueKind,
    nullable: bool,
    primary_key: bool,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Double-quoted identifier for SQL generation.
    pub fn quoted(&self) -> String {
        quote_ident(&self.name)
    }
}

/// Descriptor of a storable record type (one table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    name: String,
    fields: Vec<Field>,
    primary_key: usize,
}

impl RecordType {
    /// Starts describing the record type stored in table `name`.
    pub fn builder(name: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quoted_name(&self) -> String {
        quote_ident(&self.name)
    }

    /// Looks up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn primary_key(&self) -> &Field {
        &self.fields[self.primary_key]
    }
}

/// Incremental builder for `RecordType`.
#[derive(Debug, Clone)]
pub struct RecordTypeBuilder {
    name: String,
    fields: Vec<Field>,
}

impl RecordTypeBuilder {
    /// Declares the identity field. Declaring a second one replaces the flag on the first.
    pub fn primary_key(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        for field in &mut self.fields {
            field.primary_key = false;
        }
        self.fields.push(Field {
            name: name.into(),
            kind,
            nullable: false,
            primary_key: true,
        });
        self
    }

    /// Declares a `NOT NULL` field.
    pub fn field(self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.push(name.into(), kind, false)
    }

    /// Declares a field that may hold `NULL`.
    pub fn nullable_field(self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.push(name.into(), kind, true)
    }

    fn push(mut self, name: String, kind: ValueKind, nullable: bool) -> Self {
        self.fields.push(Field {
            name,
            kind,
            nullable,
            primary_key: false,
        });
        self
    }

    pub fn build(self) -> Result<RecordType, SchemaError> {
        validate_identifier(&self.name)?;
        for (index, field) in self.fields.iter().enumerate() {
            validate_identifier(&field.name)?;
            if field.kind == ValueKind::Null {
                return Err(SchemaError::NullKind {
                    record_type: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            if self.fields[..index].iter().any(|prior| prior.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    record_type: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
        let Some(primary_key) = self.fields.iter().position(|field| field.primary_key) else {
            return Err(SchemaError::MissingPrimaryKey(self.name));
        };

        Ok(RecordType {
            name: self.name,
            fields: self.fields,
            primary_key,
        })
    }
}

/// Returns whether `name` can be used as an unescaped SQL identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}
