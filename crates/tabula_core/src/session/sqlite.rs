//! SQLite session over a caller-owned connection.
//!
//! # Invariants
//! - Identifiers come from a validated `RecordType` and are double-quoted;
//!   every value travels as a bound parameter.
//! - No `ORDER BY` is emitted; results follow SQLite's natural (rowid) order.

use super::{Session, StoreError, StoreResult};
use crate::criteria::Predicate;
use crate::record::Record;
use crate::schema::RecordType;
use crate::value::{FieldValues, Value};
use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Row};

/// Session bound to a SQLite connection.
///
/// Pass a `rusqlite::Transaction` (it derefs to `Connection`) to scope
/// repository work inside a caller-managed transaction.
pub struct SqliteSession<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSession<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query(
        &self,
        record_type: &RecordType,
        sql: &str,
        bind_values: Vec<&Value>,
    ) -> StoreResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(parse_record_row(record_type, row)?);
        }

        Ok(records)
    }
}

#[async_trait(?Send)]
impl<'conn> Session for SqliteSession<'conn> {
    async fn execute_insert(
        &self,
        record_type: &RecordType,
        fields: &FieldValues,
    ) -> StoreResult<()> {
        let sql = if fields.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES;", record_type.quoted_name())
        } else {
            let columns = quoted_columns(record_type, fields)?.join(", ");
            let placeholders = vec!["?"; fields.len()].join(", ");
            format!(
                "INSERT INTO {} ({columns}) VALUES ({placeholders});",
                record_type.quoted_name()
            )
        };

        self.conn.execute(&sql, params_from_iter(fields.values()))?;
        Ok(())
    }

    async fn execute_select(
        &self,
        record_type: &RecordType,
        predicates: &[Predicate],
    ) -> StoreResult<Vec<Record>> {
        let sql = format!("{}{};", select_sql(record_type), where_clause(predicates));
        self.query(record_type, &sql, bind_values(predicates))
    }

    async fn execute_select_one(
        &self,
        record_type: &RecordType,
        predicates: &[Predicate],
    ) -> StoreResult<Option<Record>> {
        let sql = format!(
            "{}{} LIMIT 1;",
            select_sql(record_type),
            where_clause(predicates)
        );
        let records = self.query(record_type, &sql, bind_values(predicates))?;
        Ok(records.into_iter().next())
    }

    async fn execute_update(
        &self,
        record_type: &RecordType,
        predicates: &[Predicate],
        fields: &FieldValues,
    ) -> StoreResult<u64> {
        let assignments = quoted_columns(record_type, fields)?
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments}{};",
            record_type.quoted_name(),
            where_clause(predicates)
        );

        let mut params: Vec<&Value> = fields.values().collect();
        params.extend(bind_values(predicates));
        let changed = self.conn.execute(&sql, params_from_iter(params))?;
        Ok(changed as u64)
    }

    async fn execute_delete(
        &self,
        record_type: &RecordType,
        predicates: &[Predicate],
    ) -> StoreResult<u64> {
        let sql = format!(
            "DELETE FROM {}{};",
            record_type.quoted_name(),
            where_clause(predicates)
        );
        let changed = self
            .conn
            .execute(&sql, params_from_iter(bind_values(predicates)))?;
        Ok(changed as u64)
    }

    async fn get_by_identity(
        &self,
        record_type: &RecordType,
        id: &Value,
    ) -> StoreResult<Option<Record>> {
        let sql = format!(
            "{} WHERE {} = ?1;",
            select_sql(record_type),
            record_type.primary_key().quoted()
        );
        let records = self.query(record_type, &sql, vec![id])?;
        Ok(records.into_iter().next())
    }
}

fn select_sql(record_type: &RecordType) -> String {
    let columns = record_type
        .fields()
        .iter()
        .map(|field| field.quoted())
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {columns} FROM {}", record_type.quoted_name())
}

fn quoted_columns(record_type: &RecordType, fields: &FieldValues) -> StoreResult<Vec<String>> {
    fields
        .names()
        .map(|name| {
            record_type
                .field(name)
                .map(|field| field.quoted())
                .ok_or_else(|| {
                    StoreError::InvalidData(format!(
                        "record type `{}` has no field `{name}`",
                        record_type.name()
                    ))
                })
        })
        .collect()
}

fn where_clause(predicates: &[Predicate]) -> String {
    if predicates.is_empty() {
        return String::new();
    }

    let conditions = predicates
        .iter()
        .map(Predicate::to_sql)
        .collect::<Vec<_>>()
        .join(" AND ");
    format!(" WHERE {conditions}")
}

fn bind_values(predicates: &[Predicate]) -> Vec<&Value> {
    predicates.iter().filter_map(Predicate::bind_value).collect()
}

fn parse_record_row(record_type: &RecordType, row: &Row<'_>) -> StoreResult<Record> {
    let mut values = FieldValues::new();
    for (index, field) in record_type.fields().iter().enumerate() {
        let raw: SqlValue = row.get(index)?;
        let value = Value::from_sql(field.kind(), raw).map_err(|message| {
            StoreError::InvalidData(format!(
                "{}.{}: {message}",
                record_type.name(),
                field.name()
            ))
        })?;
        values.insert(field.name(), value);
    }
    Ok(Record::new(values))
}

#[cfg(test)]
mod tests {
    use super::{quoted_columns, where_clause};
    use crate::criteria::CriteriaSet;
    use crate::schema::RecordType;
    use crate::session::StoreError;
    use crate::value::{FieldValues, Value, ValueKind};
    use std::sync::Arc;

    fn chemistry() -> RecordType {
        RecordType::builder("chemistry")
            .primary_key("id", ValueKind::Integer)
            .field("wt", ValueKind::Integer)
            .build()
            .unwrap()
    }

    #[test]
    fn write_columns_come_from_declared_fields() {
        let fields = FieldValues::new().with("wt", 1).with("id", 2);
        assert_eq!(
            quoted_columns(&chemistry(), &fields).unwrap(),
            vec!["\"wt\"".to_string(), "\"id\"".to_string()]
        );
    }

    #[test]
    fn undeclared_write_column_is_rejected() {
        let fields = FieldValues::new().with("wt\" = 0; --", 1);
        let err = quoted_columns(&chemistry(), &fields).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[test]
    fn where_clause_is_empty_without_predicates() {
        assert_eq!(where_clause(&[]), "");
    }

    #[test]
    fn where_clause_joins_predicates_with_and() {
        let record_type = Arc::new(
            RecordType::builder("chemistry")
                .primary_key("id", ValueKind::Integer)
                .field("wt", ValueKind::Integer)
                .nullable_field("note", ValueKind::Text)
                .build()
                .unwrap(),
        );
        let predicates = CriteriaSet::new()
            .with("wt", 1)
            .with("note", Value::Null)
            .bound(record_type)
            .collect_predicates()
            .unwrap();

        assert_eq!(
            where_clause(&predicates),
            " WHERE \"wt\" = ? AND \"note\" IS NULL"
        );
    }
}
