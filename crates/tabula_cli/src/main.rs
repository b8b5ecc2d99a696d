//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `tabula_core` linkage with an in-memory CRUD round trip.
//! - Keep output deterministic for quick local sanity checks.

use std::error::Error;
use std::sync::Arc;
use tabula_core::db::open_db_in_memory;
use tabula_core::{
    core_version, CriteriaArg, CriteriaSet, FieldValues, RecordType, Repository,
    SessionRepository, SqliteSession, ValueKind,
};

const SAMPLE_DDL: &str = "CREATE TABLE chemistry (
    id INTEGER PRIMARY KEY,
    wt INTEGER NOT NULL,
    fe REAL NOT NULL
);";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("tabula_core version={}", core_version());

    let conn = open_db_in_memory()?;
    conn.execute_batch(SAMPLE_DDL)?;
    let record_type = Arc::new(
        RecordType::builder("chemistry")
            .primary_key("id", ValueKind::Integer)
            .field("wt", ValueKind::Integer)
            .field("fe", ValueKind::Float)
            .build()?,
    );

    let session = SqliteSession::new(&conn);
    let repo = SessionRepository::new(record_type, &session);
    for wt in [1, 1, 2] {
        repo.create(FieldValues::new().with("wt", wt).with("fe", 2.5))
            .await?;
    }

    let matching = repo.list(CriteriaSet::new().with("wt", 1).into()).await?;
    println!("tabula_core list wt=1 rows={}", matching.len());
    println!("{}", serde_json::to_string(&matching)?);

    repo.delete(CriteriaArg::Absent).await?;
    let remaining = repo.list(CriteriaArg::Absent).await?;
    println!("tabula_core delete_all remaining={}", remaining.len());

    Ok(())
}
