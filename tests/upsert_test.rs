mod common;

use cmdb_migrator::{upsert, DocumentStore, FileStore, Filter, MemoryStore, UpsertError};
use common::{create_test_dir, doc};
use serde_json::json;

const TABLE: &str = "cc_ObjAttDes";

fn property_row(name: &str) -> cmdb_migrator::Document {
    doc(json!({
        "bk_obj_id": "host",
        "bk_property_id": "bk_host_innerip",
        "bk_property_name": name,
        "ispre": true,
    }))
}

#[tokio::test]
async fn test_repeated_upsert_keeps_one_record_and_id() {
    let store = MemoryStore::new();

    let first = upsert(
        &store,
        TABLE,
        property_row("Inner IP"),
        Some("id"),
        &["bk_obj_id", "bk_property_id"],
        &[],
    )
    .await
    .expect("First upsert should insert");
    let second = upsert(
        &store,
        TABLE,
        property_row("Inner IP"),
        Some("id"),
        &["bk_obj_id", "bk_property_id"],
        &[],
    )
    .await
    .expect("Second upsert should update");

    assert!(first.inserted && !first.matched_existing);
    assert!(!second.inserted && second.matched_existing);
    assert_eq!(first.id, second.id);

    let rows = store.find(TABLE, &Filter::new()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!(first.id.unwrap()));
}

#[tokio::test]
async fn test_update_keeps_fields_outside_record() {
    let store = MemoryStore::new();
    let mut row = property_row("Inner IP");
    row.insert("placeholder".to_string(), json!("set by an operator"));
    upsert(&store, TABLE, row, Some("id"), &["bk_obj_id", "bk_property_id"], &[])
        .await
        .unwrap();

    upsert(
        &store,
        TABLE,
        property_row("Host Inner IP"),
        Some("id"),
        &["bk_obj_id", "bk_property_id"],
        &[],
    )
    .await
    .unwrap();

    let rows = store.find(TABLE, &Filter::new()).await.unwrap();
    assert_eq!(rows[0]["bk_property_name"], json!("Host Inner IP"));
    assert_eq!(rows[0]["placeholder"], json!("set by an operator"));
}

#[tokio::test]
async fn test_preexisting_duplicates_are_an_error() {
    let store = MemoryStore::new();
    store.insert(TABLE, property_row("one")).await.unwrap();
    store.insert(TABLE, property_row("two")).await.unwrap();

    let err = upsert(
        &store,
        TABLE,
        property_row("three"),
        Some("id"),
        &["bk_obj_id", "bk_property_id"],
        &[],
    )
    .await
    .expect_err("Ambiguous match must not be resolved silently");

    match err {
        UpsertError::Ambiguous { matched, fields, .. } => {
            assert_eq!(matched, 2);
            assert_eq!(fields, vec!["bk_obj_id", "bk_property_id"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let names: Vec<_> = store
        .find(TABLE, &Filter::new())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r["bk_property_name"].clone())
        .collect();
    assert_eq!(names, vec![json!("one"), json!("two")]);
}

#[tokio::test]
async fn test_sequences_increase_per_table() {
    let store = MemoryStore::new();
    let mut ids = Vec::new();
    for name in ["a", "b", "c"] {
        let outcome = upsert(
            &store,
            TABLE,
            doc(json!({"bk_property_id": name})),
            Some("id"),
            &["bk_property_id"],
            &[],
        )
        .await
        .unwrap();
        ids.push(outcome.id.unwrap());
    }
    assert_eq!(ids, vec![1, 2, 3]);

    let other = upsert(
        &store,
        "cc_PropertyGroup",
        doc(json!({"bk_group_id": "default"})),
        Some("id"),
        &["bk_group_id"],
        &[],
    )
    .await
    .unwrap();
    assert_eq!(other.id, Some(1));
}

#[tokio::test]
async fn test_upsert_against_file_store_survives_reopen() {
    let temp_dir = create_test_dir();
    let first_id = {
        let store = FileStore::open(temp_dir.path()).await.unwrap();
        upsert(
            &store,
            TABLE,
            property_row("Inner IP"),
            Some("id"),
            &["bk_property_id"],
            &[],
        )
        .await
        .unwrap()
        .id
    };

    let store = FileStore::open(temp_dir.path()).await.unwrap();
    let again = upsert(
        &store,
        TABLE,
        property_row("Inner IP"),
        Some("id"),
        &["bk_property_id"],
        &[],
    )
    .await
    .unwrap();

    assert!(again.matched_existing);
    assert_eq!(again.id, first_id);
    assert_eq!(store.count(TABLE, &Filter::new()).await.unwrap(), 1);
}
