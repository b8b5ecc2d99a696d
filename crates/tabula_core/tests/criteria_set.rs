use std::sync::Arc;
use tabula_core::{CriteriaError, CriteriaSet, FieldValues, RecordType, Value, ValueKind};

fn chemistry_type() -> Arc<RecordType> {
    Arc::new(
        RecordType::builder("chemistry")
            .primary_key("id", ValueKind::Integer)
            .field("wt", ValueKind::Integer)
            .field("fe", ValueKind::Float)
            .field("cao", ValueKind::Float)
            .field("label", ValueKind::Text)
            .build()
            .unwrap(),
    )
}

#[test]
fn predicate_count_matches_mapping_size() {
    let mappings = vec![
        FieldValues::new(),
        FieldValues::new().with("wt", 1),
        FieldValues::new().with("wt", 1).with("fe", 2.5),
        FieldValues::new()
            .with("id", 3)
            .with("wt", 1)
            .with("cao", 0.25)
            .with("label", "ore"),
    ];

    for mapping in mappings {
        let criteria = CriteriaSet::from_fields(mapping.clone()).bound(chemistry_type());
        let predicates = criteria.collect_predicates().unwrap();

        assert_eq!(predicates.len(), mapping.len());
        for (predicate, (name, _)) in predicates.iter().zip(mapping.iter()) {
            assert_eq!(predicate.field(), name);
        }
    }
}

#[test]
fn duplicate_keys_collapse_to_the_last_value() {
    let criteria: CriteriaSet = vec![("wt", 1), ("fe", 2), ("wt", 3)].into_iter().collect();
    let criteria = criteria.bound(chemistry_type());

    let predicates = criteria.collect_predicates().unwrap();
    assert_eq!(predicates.len(), 2);
    assert_eq!(predicates[0].field(), "wt");
    assert_eq!(predicates[0].value(), &Value::Integer(3));
}

#[test]
fn repeated_predicate_calls_observe_the_full_set() {
    let criteria = CriteriaSet::new()
        .with("wt", 1)
        .with("label", "ore")
        .bound(chemistry_type());

    let first: Vec<_> = criteria.predicates().unwrap().collect();
    let second: Vec<_> = criteria.predicates().unwrap().collect();
    let third: Vec<_> = criteria.predicates().unwrap().collect();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(second, third);
}

#[test]
fn construction_accepts_names_unknown_to_any_record_type() {
    let mut criteria = CriteriaSet::new().with("wagon_number", "1234");
    assert_eq!(criteria.len(), 1);
    assert!(matches!(
        criteria.predicates(),
        Err(CriteriaError::UnboundModel)
    ));

    criteria.bind(chemistry_type());
    let err = criteria.collect_predicates().unwrap_err();
    assert_eq!(
        err.to_string(),
        "record type `chemistry` has no field `wagon_number`"
    );
}
