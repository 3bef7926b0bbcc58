//! End-to-end tests for the pure consolidation pipeline: snapshot
//! normalization, registry and bulk-load aggregation, final merge and
//! post-processing. No database or network involved.

use rulesync::aggregate::{
    MISSING_CLIENT_SENTINEL, aggregate, aggregate_flat, apply_client_default, finalize, merge,
};
use rulesync::dataset::Dataset;
use rulesync::normalize::{
    CLIENT_COLUMN, END_DATE_COLUMN, RECORD_ID_COLUMN, RECORD_REF_COLUMN, RULE_ID_COLUMN,
    START_DATE_COLUMN, canonicalize_snapshot,
};
use telemetry::init_test_tracing;

const GROUP_KEYS: [&str; 3] = [CLIENT_COLUMN, START_DATE_COLUMN, END_DATE_COLUMN];

/// Header snapshot as the analytical store hands it over: mixed-case column
/// names and the legacy end-date column name.
fn header_snapshot() -> Dataset {
    let mut dataset = Dataset::new(["ID_Registro", " Cliente ", "Fecha_Inicio", "Fecha_Termino"]);
    dataset
        .push_row(vec![
            Some("H1".to_owned()),
            Some("ACME".to_owned()),
            Some("2024-01-01".to_owned()),
            Some("2024-01-31".to_owned()),
        ])
        .unwrap();
    dataset
        .push_row(vec![
            Some("H2".to_owned()),
            Some("GLOBEX".to_owned()),
            Some("nan".to_owned()),
            Some(String::new()),
        ])
        .unwrap();
    dataset
}

fn detail_snapshot() -> Dataset {
    let mut dataset = Dataset::new(["ID_Registro_Ref", "ID_Regla"]);
    for (record_ref, rule) in [("H1", "5"), ("H1", "2")] {
        dataset
            .push_row(vec![Some(record_ref.to_owned()), Some(rule.to_owned())])
            .unwrap();
    }
    dataset
}

fn bulk_snapshot() -> Dataset {
    let mut dataset = Dataset::new(["Cliente", "Fecha_Inicio", "Fecha_Fin", "ID_Regla"]);
    dataset
        .push_row(vec![
            Some("ACME".to_owned()),
            Some("2024-01-01".to_owned()),
            Some("2024-01-31".to_owned()),
            Some("2".to_owned()),
        ])
        .unwrap();
    dataset
        .push_row(vec![
            None,
            Some("2024-03-01".to_owned()),
            Some("2024-03-31".to_owned()),
            Some("8".to_owned()),
        ])
        .unwrap();
    dataset
}

fn run_pipeline() -> Vec<rulesync::RuleSet> {
    let mut headers = header_snapshot();
    let mut details = detail_snapshot();
    let mut bulk = bulk_snapshot();

    canonicalize_snapshot(&mut headers);
    canonicalize_snapshot(&mut details);
    canonicalize_snapshot(&mut bulk);
    apply_client_default(&mut bulk);

    let registry_sets = aggregate(
        &headers,
        &details,
        RECORD_ID_COLUMN,
        RECORD_REF_COLUMN,
        &GROUP_KEYS,
        RULE_ID_COLUMN,
    )
    .unwrap();
    let bulk_sets = aggregate_flat(&bulk, &GROUP_KEYS, RULE_ID_COLUMN).unwrap();

    let mut final_sets = merge([registry_sets, bulk_sets]);
    finalize(&mut final_sets);
    final_sets
}

#[test]
fn registry_and_bulk_rules_union_per_group() {
    init_test_tracing();

    let sets = run_pipeline();

    // Header H1 contributes rules 5 and 2; the bulk feed contributes 2 for
    // the same key. The union is deduplicated and naturally sorted.
    let acme = sets
        .iter()
        .find(|set| set.key.client.as_deref() == Some("ACME"))
        .unwrap();
    assert_eq!(acme.key.start_date.as_deref(), Some("2024-01-01"));
    assert_eq!(acme.key.end_date.as_deref(), Some("2024-01-31"));
    assert_eq!(acme.rules, "2,5");
}

#[test]
fn sentinel_dates_become_null_group_key_components() {
    init_test_tracing();

    let sets = run_pipeline();

    // H2's dates arrived as "nan" and "" and must group as true nulls, with
    // an empty rule set since no detail references it.
    let globex = sets
        .iter()
        .find(|set| set.key.client.as_deref() == Some("GLOBEX"))
        .unwrap();
    assert_eq!(globex.key.start_date, None);
    assert_eq!(globex.key.end_date, None);
    assert_eq!(globex.rules, "");
}

#[test]
fn bulk_rows_without_client_fall_back_to_the_sentinel() {
    init_test_tracing();

    let sets = run_pipeline();

    let fallback = sets
        .iter()
        .find(|set| set.key.client.as_deref() == Some(MISSING_CLIENT_SENTINEL))
        .unwrap();
    assert_eq!(fallback.rules, "8");
}

#[test]
fn merging_the_final_result_with_itself_changes_nothing() {
    init_test_tracing();

    let sets = run_pipeline();
    let remerged = merge([sets.clone(), sets.clone()]);

    assert_eq!(sets, remerged);
}
