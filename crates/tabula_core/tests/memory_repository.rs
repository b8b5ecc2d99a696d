use std::sync::Arc;
use tabula_core::{
    CriteriaArg, CriteriaSet, FieldValues, MemorySession, RecordType, RepoError, Repository,
    Session, SessionRepository, Value, ValueKind,
};

fn wagon_type() -> Arc<RecordType> {
    Arc::new(
        RecordType::builder("wagon")
            .primary_key("id", ValueKind::Integer)
            .field("wagon_number", ValueKind::Text)
            .field("wt", ValueKind::Integer)
            .nullable_field("load", ValueKind::Float)
            .build()
            .unwrap(),
    )
}

fn wagon(number: &str, wt: i64) -> FieldValues {
    FieldValues::new().with("wagon_number", number).with("wt", wt)
}

#[tokio::test]
async fn repository_contract_works_through_trait_object() {
    let session = MemorySession::new();
    let repo: Box<dyn Repository + '_> =
        Box::new(SessionRepository::new(wagon_type(), &session));

    repo.create(wagon("1234", 1)).await.unwrap();
    repo.create(wagon("1235", 1)).await.unwrap();
    repo.create(wagon("1236", 2)).await.unwrap();

    assert_eq!(
        repo.list(CriteriaSet::new().with("wt", 1).into())
            .await
            .unwrap()
            .len(),
        2
    );
    assert_eq!(repo.list(CriteriaArg::Absent).await.unwrap().len(), 3);

    let second = repo.get(Value::Integer(2)).await.unwrap().unwrap();
    assert_eq!(second.get_str("wagon_number"), Some("1235"));

    repo.delete(CriteriaSet::new().with("wt", 1).into())
        .await
        .unwrap();
    let remaining = repo.list(CriteriaArg::Absent).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].get_str("wagon_number"), Some("1236"));
}

#[tokio::test]
async fn session_can_be_shared_as_trait_object() {
    let session = MemorySession::new();
    let dyn_session: &dyn Session = &session;
    let repo = SessionRepository::new(wagon_type(), dyn_session);

    repo.create(wagon("1234", 1)).await.unwrap();
    assert_eq!(session.row_count(repo.record_type()), 1);
}

#[tokio::test]
async fn one_call_is_one_session_round_trip() {
    let session = MemorySession::new();
    let repo = SessionRepository::new(wagon_type(), &session);

    repo.create(wagon("1234", 1)).await.unwrap();
    repo.list(CriteriaArg::Absent).await.unwrap();
    repo.one(CriteriaSet::new().with("wt", 1).into())
        .await
        .unwrap();
    repo.update(
        CriteriaArg::Absent,
        FieldValues::new().with("load", 12.5),
    )
    .await
    .unwrap();
    repo.delete(CriteriaArg::Absent).await.unwrap();

    assert_eq!(session.calls(), 5);
}

#[tokio::test]
async fn repositories_of_different_types_share_one_session() {
    let session = MemorySession::new();
    let wagons = SessionRepository::new(wagon_type(), &session);
    let depots = SessionRepository::new(
        Arc::new(
            RecordType::builder("depot")
                .primary_key("code", ValueKind::Text)
                .field("city", ValueKind::Text)
                .build()
                .unwrap(),
        ),
        &session,
    );

    wagons.create(wagon("1234", 1)).await.unwrap();
    depots
        .create(FieldValues::new().with("code", "NSK").with("city", "Novosibirsk"))
        .await
        .unwrap();

    assert_eq!(wagons.list(CriteriaArg::Absent).await.unwrap().len(), 1);
    let depot = depots.get("NSK".into()).await.unwrap().unwrap();
    assert_eq!(depot.get_str("city"), Some("Novosibirsk"));
}

#[tokio::test]
async fn memory_session_enforces_not_null_and_unique_identity() {
    let session = MemorySession::new();
    let repo = SessionRepository::new(wagon_type(), &session);

    let err = repo
        .create(FieldValues::new().with("wt", 1))
        .await
        .unwrap_err();
    assert!(matches!(&err, RepoError::Store(store) if store.is_constraint_violation()));

    repo.create(wagon("1234", 1).with("id", 7)).await.unwrap();
    let err = repo
        .create(wagon("9999", 1).with("id", 7))
        .await
        .unwrap_err();
    assert!(matches!(&err, RepoError::Store(store) if store.is_constraint_violation()));

    repo.create(wagon("1235", 1)).await.unwrap();
    let auto = repo
        .one(CriteriaSet::new().with("wagon_number", "1235").into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(auto.get_i64("id"), Some(8));
}

#[tokio::test]
async fn failed_update_leaves_rows_unchanged() {
    let session = MemorySession::new();
    let repo = SessionRepository::new(wagon_type(), &session);
    repo.create(wagon("1234", 1)).await.unwrap();

    let err = repo
        .update(
            CriteriaArg::Absent,
            FieldValues::new().with("wt", 5).with("wagon_number", Value::Null),
        )
        .await
        .unwrap_err();
    assert!(!err.is_validation());

    let record = repo.one(CriteriaArg::Absent).await.unwrap().unwrap();
    assert_eq!(record.get_i64("wt"), Some(1));
}

#[tokio::test]
async fn update_to_duplicate_identity_is_rejected() {
    let session = MemorySession::new();
    let repo = SessionRepository::new(wagon_type(), &session);
    repo.create(wagon("1234", 1)).await.unwrap();
    repo.create(wagon("1235", 2)).await.unwrap();

    let err = repo
        .update(
            CriteriaSet::new().with("wt", 2).into(),
            FieldValues::new().with("id", 1),
        )
        .await
        .unwrap_err();
    assert!(matches!(&err, RepoError::Store(store) if store.is_constraint_violation()));

    let first = repo
        .list(CriteriaSet::new().with("id", 1).into())
        .await
        .unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].get_str("wagon_number"), Some("1234"));
}

#[tokio::test]
async fn rewritten_identity_advances_auto_ids() {
    let session = MemorySession::new();
    let repo = SessionRepository::new(wagon_type(), &session);
    repo.create(wagon("1234", 1)).await.unwrap();

    repo.update(CriteriaArg::Absent, FieldValues::new().with("id", 40))
        .await
        .unwrap();
    repo.create(wagon("1235", 1)).await.unwrap();

    let created = repo
        .one(CriteriaSet::new().with("wagon_number", "1235").into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.get_i64("id"), Some(41));
}

#[tokio::test]
async fn largest_integer_identity_is_accepted() {
    let session = MemorySession::new();
    let repo = SessionRepository::new(wagon_type(), &session);

    repo.create(wagon("1234", 1).with("id", i64::MAX))
        .await
        .unwrap();
    let stored = repo.get(Value::Integer(i64::MAX)).await.unwrap().unwrap();
    assert_eq!(stored.get_str("wagon_number"), Some("1234"));

    let err = repo.create(wagon("1235", 1)).await.unwrap_err();
    assert!(matches!(&err, RepoError::Store(store) if store.is_constraint_violation()));
    assert_eq!(session.row_count(repo.record_type()), 1);
}

#[tokio::test]
async fn kind_mismatch_in_writes_fails_locally() {
    let session = MemorySession::new();
    let repo = SessionRepository::new(wagon_type(), &session);

    let err = repo
        .create(wagon("1234", 1).with("load", "heavy"))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("expects float value, got text"));
    assert_eq!(session.calls(), 0);
}
