//! Criteria builder and generic CRUD repository over transactional sessions.
//!
//! Callers describe a record type once, build `CriteriaSet`s of equality
//! constraints, and run `create/get/list/update/delete/one` through a
//! `Repository` bound to a caller-owned `Session`.

pub mod criteria;
pub mod db;
pub mod logging;
pub mod record;
pub mod repo;
pub mod schema;
pub mod session;
pub mod value;

pub use criteria::{CriteriaError, CriteriaSet, Predicate};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use record::Record;
pub use repo::{CriteriaArg, RepoError, RepoResult, Repository, SessionRepository};
pub use schema::{Field, RecordType, SchemaError};
pub use session::{MemorySession, Session, SqliteSession, StoreError, StoreResult};
pub use value::{FieldValues, Value, ValueKind};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
