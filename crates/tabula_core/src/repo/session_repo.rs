//! Repository implementation over any `Session`.
//!
//! # Invariants
//! - Every criteria-accepting call runs: type check -> default empty set ->
//!   bind -> expand predicates -> one session operation.
//! - Field names in writes are resolved against the record type before the
//!   session is used.
//! - Logs carry metadata only (table, counts, timings), never field values.

use super::{CriteriaArg, RepoResult, Repository};
use crate::criteria::{coerce_for_field, resolve_field, Predicate};
use crate::record::Record;
use crate::schema::RecordType;
use crate::session::Session;
use crate::value::{FieldValues, Value};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::time::Instant;

/// CRUD repository for one record type, borrowing a caller-owned session.
pub struct SessionRepository<'s, S: Session + ?Sized> {
    record_type: Arc<RecordType>,
    session: &'s S,
}

impl<'s, S: Session + ?Sized> SessionRepository<'s, S> {
    pub fn new(record_type: Arc<RecordType>, session: &'s S) -> Self {
        Self {
            record_type,
            session,
        }
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    /// Expands a criteria argument into predicates for this record type.
    fn scope(&self, criteria: CriteriaArg) -> RepoResult<Vec<Predicate>> {
        let mut criteria = criteria.resolve()?;
        criteria.bind(Arc::clone(&self.record_type));
        Ok(criteria.collect_predicates()?)
    }

    /// Resolves write field names and coerces values to declared kinds.
    fn resolve_fields(&self, fields: FieldValues) -> RepoResult<FieldValues> {
        let mut resolved = FieldValues::new();
        for (name, value) in fields {
            let field = resolve_field(&self.record_type, &name)?;
            resolved.insert(name, coerce_for_field(field, value)?);
        }
        Ok(resolved)
    }
}

#[async_trait(?Send)]
impl<'s, S: Session + ?Sized> Repository for SessionRepository<'s, S> {
    async fn create(&self, fields: FieldValues) -> RepoResult<()> {
        let fields = self.resolve_fields(fields)?;
        let started_at = Instant::now();

        self.session
            .execute_insert(&self.record_type, &fields)
            .await?;

        debug!(
            "event=repo_create module=repo status=ok table={} fields={} duration_ms={}",
            self.record_type.name(),
            fields.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    async fn get(&self, id: Value) -> RepoResult<Option<Record>> {
        let primary_key = self.record_type.primary_key();
        let Ok(id) = coerce_for_field(primary_key, id) else {
            debug!(
                "event=repo_get module=repo status=ok table={} found=false reason=key_kind",
                self.record_type.name()
            );
            return Ok(None);
        };
        let started_at = Instant::now();

        let record = self
            .session
            .get_by_identity(&self.record_type, &id)
            .await?;

        debug!(
            "event=repo_get module=repo status=ok table={} found={} duration_ms={}",
            self.record_type.name(),
            record.is_some(),
            started_at.elapsed().as_millis()
        );
        Ok(record)
    }

    async fn list(&self, criteria: CriteriaArg) -> RepoResult<Vec<Record>> {
        let predicates = self.scope(criteria)?;
        let started_at = Instant::now();

        let records = self
            .session
            .execute_select(&self.record_type, &predicates)
            .await?;

        debug!(
            "event=repo_list module=repo status=ok table={} predicates={} rows={} duration_ms={}",
            self.record_type.name(),
            predicates.len(),
            records.len(),
            started_at.elapsed().as_millis()
        );
        Ok(records)
    }

    async fn update(&self, criteria: CriteriaArg, fields: FieldValues) -> RepoResult<()> {
        let predicates = self.scope(criteria)?;
        let fields = self.resolve_fields(fields)?;
        if fields.is_empty() {
            debug!(
                "event=repo_update module=repo status=skipped table={} reason=no_fields",
                self.record_type.name()
            );
            return Ok(());
        }
        let started_at = Instant::now();

        let changed = self
            .session
            .execute_update(&self.record_type, &predicates, &fields)
            .await?;

        debug!(
            "event=repo_update module=repo status=ok table={} predicates={} rows={} duration_ms={}",
            self.record_type.name(),
            predicates.len(),
            changed,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    async fn delete(&self, criteria: CriteriaArg) -> RepoResult<()> {
        let predicates = self.scope(criteria)?;
        let started_at = Instant::now();

        let removed = self
            .session
            .execute_delete(&self.record_type, &predicates)
            .await?;

        debug!(
            "event=repo_delete module=repo status=ok table={} predicates={} rows={} duration_ms={}",
            self.record_type.name(),
            predicates.len(),
            removed,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    async fn one(&self, criteria: CriteriaArg) -> RepoResult<Option<Record>> {
        let predicates = self.scope(criteria)?;
        let started_at = Instant::now();

        let record = self
            .session
            .execute_select_one(&self.record_type, &predicates)
            .await?;

        debug!(
            "event=repo_one module=repo status=ok table={} predicates={} found={} duration_ms={}",
            self.record_type.name(),
            predicates.len(),
            record.is_some(),
            started_at.elapsed().as_millis()
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::SessionRepository;
    use crate::criteria::{CriteriaError, CriteriaSet};
    use crate::repo::{CriteriaArg, RepoError, Repository};
    use crate::schema::RecordType;
    use crate::session::MemorySession;
    use crate::value::{FieldValues, Value, ValueKind};
    use std::sync::Arc;

    fn chemistry() -> Arc<RecordType> {
        Arc::new(
            RecordType::builder("chemistry")
                .primary_key("id", ValueKind::Integer)
                .field("wt", ValueKind::Integer)
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn invalid_criteria_type_fails_before_session_interaction() {
        let session = MemorySession::new();
        let repo = SessionRepository::new(chemistry(), &session);

        for result in [
            repo.list(1_i64.into()).await.map(|_| ()),
            repo.one(1_i64.into()).await.map(|_| ()),
            repo.update(1_i64.into(), FieldValues::new().with("wt", 2)).await,
            repo.delete(1_i64.into()).await,
        ] {
            assert!(matches!(
                result,
                Err(RepoError::InvalidCriteriaType { ref found }) if found == "integer"
            ));
        }
        assert_eq!(session.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_fields_fail_before_session_interaction() {
        let session = MemorySession::new();
        let repo = SessionRepository::new(chemistry(), &session);

        let list_err = repo
            .list(CriteriaSet::new().with("colour", "red").into())
            .await
            .unwrap_err();
        assert!(matches!(
            list_err,
            RepoError::Criteria(CriteriaError::UnknownField { .. })
        ));

        let create_err = repo
            .create(FieldValues::new().with("colour", "red"))
            .await
            .unwrap_err();
        assert!(create_err.is_validation());

        let update_err = repo
            .update(CriteriaArg::Absent, FieldValues::new().with("colour", "red"))
            .await
            .unwrap_err();
        assert!(update_err.is_validation());

        assert_eq!(session.calls(), 0);
    }

    #[tokio::test]
    async fn update_without_fields_is_a_no_op() {
        let session = MemorySession::new();
        let repo = SessionRepository::new(chemistry(), &session);

        repo.update(CriteriaArg::Absent, FieldValues::new())
            .await
            .unwrap();
        assert_eq!(session.calls(), 0);
    }

    #[tokio::test]
    async fn get_with_id_of_another_kind_finds_nothing() {
        let session = MemorySession::new();
        let repo = SessionRepository::new(chemistry(), &session);
        repo.create(FieldValues::new().with("wt", 1)).await.unwrap();

        assert!(repo.get(Value::from("1")).await.unwrap().is_none());
        assert!(repo.get(Value::Integer(1)).await.unwrap().is_some());
        assert_eq!(session.calls(), 2);
    }
}
