//! Repository layer abstractions and the session-backed implementation.
//!
//! # Responsibility
//! - Define a uniform CRUD contract over one record type.
//! - Translate optional criteria into predicates before touching the store.
//!
//! # Invariants
//! - Criteria arguments are type-checked, bound and expanded before any
//!   session interaction; a malformed argument never reaches the store.
//! - Store failures are returned unchanged inside `RepoError::Store`.

use crate::criteria::CriteriaError;
use crate::record::Record;
use crate::session::StoreError;
use crate::value::{FieldValues, Value};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod argument;
mod session_repo;

pub use argument::CriteriaArg;
pub use session_repo::SessionRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error returned by repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// The criteria argument was neither absent nor a criteria set.
    InvalidCriteriaType { found: String },
    Criteria(CriteriaError),
    Store(StoreError),
}

impl RepoError {
    /// Returns whether this error was raised locally, before the store was used.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCriteriaType { found } => write!(
                f,
                "required type `CriteriaSet` for criteria argument, not `{found}`"
            ),
            Self::Criteria(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidCriteriaType { .. } => None,
            Self::Criteria(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<CriteriaError> for RepoError {
    fn from(value: CriteriaError) -> Self {
        Self::Criteria(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Uniform CRUD contract over one record type.
///
/// Criteria-accepting methods treat `CriteriaArg::Absent` as "match every
/// record".
#[async_trait(?Send)]
pub trait Repository {
    /// Inserts one record with the given field values.
    async fn create(&self, fields: FieldValues) -> RepoResult<()>;
    /// Looks one record up by primary key.
    ///
    /// An id that cannot be stored in the key's kind matches nothing and
    /// yields `Ok(None)`; integers widen to float keys and ISO text to date keys.
    async fn get(&self, id: Value) -> RepoResult<Option<Record>>;
    /// Returns every matching record in store natural order.
    async fn list(&self, criteria: CriteriaArg) -> RepoResult<Vec<Record>>;
    /// Applies `fields` to every matching record. Zero matches is not an error.
    async fn update(&self, criteria: CriteriaArg, fields: FieldValues) -> RepoResult<()>;
    /// Removes every matching record. Zero matches is not an error.
    async fn delete(&self, criteria: CriteriaArg) -> RepoResult<()>;
    /// Returns one matching record; with several matches, the first in natural order.
    async fn one(&self, criteria: CriteriaArg) -> RepoResult<Option<Record>>;
}
