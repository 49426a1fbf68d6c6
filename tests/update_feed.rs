mod common;

use collegium::application::error::ErrorKind;
use collegium::application::feed::METADATA_COLLECTION;
use collegium::application::repos::DocumentStore;
use collegium::domain::types::RecordKind;
use common::{harness, put};
use serde_json::json;

async fn seed_updates(store: &dyn DocumentStore, kind: RecordKind, versions: &[u64]) {
    for version in versions {
        put(
            store,
            kind.updates_collection(),
            &format!("u{version}"),
            json!({ "version": version, "action": "update", "recordId": format!("r{version}") }),
        )
        .await;
    }
}

#[tokio::test]
async fn version_is_initialised_once() {
    let h = harness(true);
    let feed = &h.catalog.feed;

    let first = feed.version(RecordKind::Institution).await.expect("first");
    assert_eq!(serde_json::to_value(first).expect("json"), json!({ "version": "1" }));

    let second = feed.version(RecordKind::Institution).await.expect("second");
    assert_eq!(first, second);
    assert_eq!(h.documents.count(METADATA_COLLECTION).await, 1);

    let stored = h
        .documents
        .get(METADATA_COLLECTION, RecordKind::Institution.version_document())
        .await
        .expect("read counter")
        .expect("counter persisted");
    assert_eq!(stored.body.get("version"), Some(&json!("1")));
}

#[tokio::test]
async fn existing_counters_are_read_not_reset() {
    let h = harness(true);
    put(
        h.documents.as_ref(),
        METADATA_COLLECTION,
        "cutoffs_version",
        json!({ "version": "42" }),
    )
    .await;

    let version = h.catalog.feed.version(RecordKind::Cutoff).await.expect("version");
    assert_eq!(version.version, 42);

    let institutions = h
        .catalog
        .feed
        .version(RecordKind::Institution)
        .await
        .expect("independent counter");
    assert_eq!(institutions.version, 1);
}

#[tokio::test]
async fn updates_cover_the_half_open_range_in_order() {
    let h = harness(true);
    seed_updates(h.documents.as_ref(), RecordKind::Institution, &[9, 3, 7, 5, 8, 6]).await;

    let updates = h
        .catalog
        .feed
        .updates(RecordKind::Institution, Some(5), Some(8))
        .await
        .expect("updates");

    let versions: Vec<u64> = updates.iter().map(|update| update.version).collect();
    assert_eq!(versions, [6, 7, 8]);
    assert_eq!(updates[0].payload.get("recordId"), Some(&json!("r6")));
}

#[tokio::test]
async fn from_version_defaults_to_the_start_of_the_feed() {
    let h = harness(true);
    seed_updates(h.documents.as_ref(), RecordKind::Cutoff, &[1, 2, 3]).await;

    let updates = h
        .catalog
        .feed
        .updates(RecordKind::Cutoff, None, Some(2))
        .await
        .expect("updates");
    let versions: Vec<u64> = updates.iter().map(|update| update.version).collect();
    assert_eq!(versions, [1, 2]);
}

#[tokio::test]
async fn to_version_is_required() {
    let h = harness(true);
    let err = h
        .catalog
        .feed
        .updates(RecordKind::Institution, Some(1), None)
        .await
        .expect_err("missing toVersion");
    assert_eq!(err.kind(), ErrorKind::MissingParameter);
    assert!(err.to_string().contains("toVersion"));
}

#[tokio::test]
async fn ranges_are_cached_only_once_the_counter_reaches_them() {
    let h = harness(true);
    let store = h.documents.as_ref();
    let feed = &h.catalog.feed;
    put(store, METADATA_COLLECTION, "colleges_version", json!({ "version": 7 })).await;
    seed_updates(store, RecordKind::Institution, &[6, 7]).await;

    let early = feed
        .updates(RecordKind::Institution, Some(5), Some(8))
        .await
        .expect("early");
    assert_eq!(early.len(), 2);

    seed_updates(store, RecordKind::Institution, &[8]).await;
    put(store, METADATA_COLLECTION, "colleges_version", json!({ "version": 8 })).await;

    let settled = feed
        .updates(RecordKind::Institution, Some(5), Some(8))
        .await
        .expect("settled");
    assert_eq!(settled.len(), 3);

    store
        .delete(RecordKind::Institution.updates_collection(), "u7")
        .await
        .expect("delete");
    let cached = feed
        .updates(RecordKind::Institution, Some(5), Some(8))
        .await
        .expect("cached");
    assert_eq!(cached, settled);
}
