//! Store sessions the repository issues operations through.
//!
//! # Responsibility
//! - Define the transactional handle contract consumed by repositories.
//! - Provide a SQLite session over a caller-owned connection/transaction and
//!   an in-process session for tests.
//!
//! # Invariants
//! - Sessions never commit, roll back or close anything; the caller owns the
//!   transaction boundary.
//! - Inputs arrive already resolved against the record type: field names are
//!   declared identifiers and values are coerced to the declared kinds.
//! - Store errors are returned as-is; no retry happens at this layer.

use crate::criteria::Predicate;
use crate::record::Record;
use crate::schema::RecordType;
use crate::value::{FieldValues, Value};
use async_trait::async_trait;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite;

pub use memory::MemorySession;
pub use sqlite::SqliteSession;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by the underlying store.
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// Constraint violation reported by a non-SQLite session.
    Constraint(String),
    /// Stored data cannot be decoded per the record type.
    InvalidData(String),
}

impl StoreError {
    /// Returns whether the store rejected a write due to a schema constraint
    /// (NOT NULL, UNIQUE, CHECK, FOREIGN KEY).
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == ErrorCode::ConstraintViolation
            }
            Self::Sqlite(_) => false,
            Self::Constraint(_) => true,
            Self::InvalidData(_) => false,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Constraint(message) => write!(f, "constraint failed: {message}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Constraint(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Transactional handle owned by the caller.
///
/// Futures are not `Send`: SQLite connections cannot be shared across threads,
/// and one session serves one in-flight operation at a time.
#[async_trait(?Send)]
pub trait Session {
    /// Inserts one row.
    async fn execute_insert(&self, record_type: &RecordType, fields: &FieldValues)
        -> StoreResult<()>;

    /// Selects every row matching all predicates, in store natural order.
    async fn execute_select(
        &self,
        record_type: &RecordType,
        predicates: &[Predicate],
    ) -> StoreResult<Vec<Record>>;

    /// Selects the first matching row, if any.
    async fn execute_select_one(
        &self,
        record_type: &RecordType,
        predicates: &[Predicate],
    ) -> StoreResult<Option<Record>>;

    /// Applies `fields` to every matching row and returns the affected count.
    async fn execute_update(
        &self,
        record_type: &RecordType,
        predicates: &[Predicate],
        fields: &FieldValues,
    ) -> StoreResult<u64>;

    /// Removes every matching row and returns the affected count.
    async fn execute_delete(
        &self,
        record_type: &RecordType,
        predicates: &[Predicate],
    ) -> StoreResult<u64>;

    /// Looks a row up by primary key.
    async fn get_by_identity(&self, record_type: &RecordType, id: &Value)
        -> StoreResult<Option<Record>>;
}
