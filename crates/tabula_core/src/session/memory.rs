//! In-process session used as a test double.
//!
//! # Invariants
//! - Natural order is insertion order.
//! - Integer primary keys left unset are auto-assigned (max + 1), like SQLite
//!   `INTEGER PRIMARY KEY`, saturating at `i64::MAX`.
//! - NOT NULL and primary-key uniqueness are enforced on insert and update;
//!   a failing write leaves the table unchanged.

use super::{Session, StoreError, StoreResult};
use crate::criteria::Predicate;
use crate::record::Record;
use crate::schema::RecordType;
use crate::value::{FieldValues, Value, ValueKind};
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct MemoryTable {
    rows: Vec<FieldValues>,
    next_id: i64,
}

impl MemoryTable {
    /// Keeps `next_id` past the largest integer key; saturates at `i64::MAX`.
    fn advance_next_id(&mut self, primary_key: &str) {
        let max_id = self
            .rows
            .iter()
            .filter_map(|row| match row.get(primary_key) {
                Some(Value::Integer(id)) => Some(*id),
                _ => None,
            })
            .max();
        if let Some(max_id) = max_id {
            self.next_id = self.next_id.max(max_id.saturating_add(1));
        }
    }
}

/// Session storing rows in process memory.
#[derive(Debug, Default)]
pub struct MemorySession {
    tables: RefCell<BTreeMap<String, MemoryTable>>,
    calls: Cell<usize>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of session operations issued so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Number of rows currently stored for `record_type`.
    pub fn row_count(&self, record_type: &RecordType) -> usize {
        self.tables
            .borrow()
            .get(record_type.name())
            .map_or(0, |table| table.rows.len())
    }

    fn touch(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn select(&self, record_type: &RecordType, predicates: &[Predicate]) -> Vec<Record> {
        self.tables
            .borrow()
            .get(record_type.name())
            .map(|table| {
                table
                    .rows
                    .iter()
                    .filter(|row| row_matches(row, predicates))
                    .cloned()
                    .map(Record::new)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait(?Send)]
impl Session for MemorySession {
    async fn execute_insert(
        &self,
        record_type: &RecordType,
        fields: &FieldValues,
    ) -> StoreResult<()> {
        self.touch();
        let mut tables = self.tables.borrow_mut();
        let table = tables.entry(record_type.name().to_string()).or_default();

        let primary_key = record_type.primary_key();
        let mut row = FieldValues::new();
        for field in record_type.fields() {
            let value = fields.get(field.name()).cloned().unwrap_or(Value::Null);
            row.insert(field.name(), value);
        }

        if row.get(primary_key.name()).is_some_and(Value::is_null)
            && primary_key.kind() == ValueKind::Integer
        {
            let next_id = table.next_id.max(1);
            row.insert(primary_key.name(), next_id);
        }

        check_not_null(record_type, &row)?;
        let id = row.get(primary_key.name()).cloned().unwrap_or(Value::Null);
        if table
            .rows
            .iter()
            .any(|existing| existing.get(primary_key.name()) == Some(&id))
        {
            return Err(unique_violation(record_type));
        }

        table.rows.push(row);
        table.advance_next_id(primary_key.name());
        Ok(())
    }

    async fn execute_select(
        &self,
        record_type: &RecordType,
        predicates: &[Predicate],
    ) -> StoreResult<Vec<Record>> {
        self.touch();
        Ok(self.select(record_type, predicates))
    }

    async fn execute_select_one(
        &self,
        record_type: &RecordType,
        predicates: &[Predicate],
    ) -> StoreResult<Option<Record>> {
        self.touch();
        Ok(self.select(record_type, predicates).into_iter().next())
    }

    async fn execute_update(
        &self,
        record_type: &RecordType,
        predicates: &[Predicate],
        fields: &FieldValues,
    ) -> StoreResult<u64> {
        self.touch();
        let mut tables = self.tables.borrow_mut();
        let Some(table) = tables.get_mut(record_type.name()) else {
            return Ok(0);
        };

        let mut updated = table.rows.clone();
        let mut changed = 0;
        for row in updated.iter_mut().filter(|row| row_matches(row, predicates)) {
            for (name, value) in fields.iter() {
                row.insert(name, value.clone());
            }
            check_not_null(record_type, row)?;
            changed += 1;
        }
        check_unique_identity(record_type, &updated)?;

        table.rows = updated;
        table.advance_next_id(record_type.primary_key().name());
        Ok(changed)
    }

    async fn execute_delete(
        &self,
        record_type: &RecordType,
        predicates: &[Predicate],
    ) -> StoreResult<u64> {
        self.touch();
        let mut tables = self.tables.borrow_mut();
        let Some(table) = tables.get_mut(record_type.name()) else {
            return Ok(0);
        };

        let before = table.rows.len();
        table.rows.retain(|row| !row_matches(row, predicates));
        Ok((before - table.rows.len()) as u64)
    }

    async fn get_by_identity(
        &self,
        record_type: &RecordType,
        id: &Value,
    ) -> StoreResult<Option<Record>> {
        self.touch();
        let primary_key = record_type.primary_key().name();
        Ok(self.tables.borrow().get(record_type.name()).and_then(|table| {
            table
                .rows
                .iter()
                .find(|row| row.get(primary_key) == Some(id))
                .cloned()
                .map(Record::new)
        }))
    }
}

fn row_matches(row: &FieldValues, predicates: &[Predicate]) -> bool {
    predicates
        .iter()
        .all(|predicate| predicate.matches(row.get(predicate.field())))
}

fn check_unique_identity(record_type: &RecordType, rows: &[FieldValues]) -> StoreResult<()> {
    let primary_key = record_type.primary_key().name();
    for (index, row) in rows.iter().enumerate() {
        let id = row.get(primary_key);
        if rows[..index]
            .iter()
            .any(|earlier| earlier.get(primary_key) == id)
        {
            return Err(unique_violation(record_type));
        }
    }
    Ok(())
}

fn unique_violation(record_type: &RecordType) -> StoreError {
    StoreError::Constraint(format!(
        "UNIQUE constraint failed: {}.{}",
        record_type.name(),
        record_type.primary_key().name()
    ))
}

fn check_not_null(record_type: &RecordType, row: &FieldValues) -> StoreResult<()> {
    for field in record_type.fields() {
        if !field.is_nullable() && row.get(field.name()).map_or(true, Value::is_null) {
            return Err(StoreError::Constraint(format!(
                "NOT NULL constraint failed: {}.{}",
                record_type.name(),
                field.name()
            )));
        }
    }
    Ok(())
}
