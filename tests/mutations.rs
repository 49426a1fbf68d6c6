mod common;

use collegium::application::error::{AppError, ErrorKind};
use collegium::application::search::InstitutionCriteria;
use collegium::cache::InvalidationStrategy;
use collegium::config::InvalidationMode;
use collegium::domain::entities::Record;
use common::{failing_cache_harness, harness, seed_cutoffs, seed_institutions};
use serde_json::json;

fn ids<R: Record>(records: &[R]) -> Vec<String> {
    records.iter().map(|record| record.id().to_string()).collect()
}

async fn update_is_visible_to_every_read(prefix_scan: bool, expected: InvalidationStrategy) {
    let h = harness(prefix_scan);
    assert_eq!(h.catalog.invalidation.strategy(), expected);
    seed_institutions(h.documents.as_ref()).await;
    let institutions = &h.catalog.institutions;
    let criteria = InstitutionCriteria {
        city: Some("Mumbai".to_string()),
        ..Default::default()
    };

    // Warm detail, list and search entries.
    institutions.get_by_id("c").await.expect("detail");
    institutions.list(None, Some(10), None).await.expect("list");
    institutions.search(&criteria, None, None).await.expect("search");

    let updated = institutions
        .update("c", json!({ "instituteName": "IIT Bombay (Powai)", "city": "Powai" }))
        .await
        .expect("update");
    assert_eq!(updated.institute_name, "IIT Bombay (Powai)");

    let detail = institutions.get_by_id("c").await.expect("detail after");
    assert_eq!(detail.institute_name, "IIT Bombay (Powai)");

    let list = institutions.list(None, Some(10), None).await.expect("list after");
    let listed = list
        .items
        .iter()
        .find(|record| record.id == "c")
        .expect("listed");
    assert_eq!(listed.city.as_deref(), Some("Powai"));

    let search = institutions
        .search(&criteria, None, None)
        .await
        .expect("search after");
    assert_eq!(ids(&search.items), ["g"]);
}

#[tokio::test]
async fn prefix_invalidation_drops_stale_entries() {
    update_is_visible_to_every_read(true, InvalidationStrategy::PrefixDelete).await;
}

#[tokio::test]
async fn generation_tags_retire_stale_entries() {
    update_is_visible_to_every_read(false, InvalidationStrategy::GenerationTag).await;
}

#[tokio::test]
async fn failed_reread_after_update_still_invalidates() {
    for prefix_scan in [true, false] {
        let h = harness(prefix_scan);
        seed_institutions(h.documents.as_ref()).await;
        let institutions = &h.catalog.institutions;
        institutions.get_by_id("c").await.expect("warm detail");
        institutions.list(None, Some(10), None).await.expect("warm list");

        h.documents.fail_read_after_update();
        let err = institutions
            .update("c", json!({ "instituteName": "IIT Bombay (Powai)" }))
            .await
            .expect_err("re-read fails");
        assert_eq!(err.kind(), ErrorKind::Collaborator);

        let detail = institutions.get_by_id("c").await.expect("detail after");
        assert_eq!(detail.institute_name, "IIT Bombay (Powai)");

        let list = institutions.list(None, Some(10), None).await.expect("list after");
        let listed = list
            .items
            .iter()
            .find(|record| record.id == "c")
            .expect("listed");
        assert_eq!(listed.institute_name, "IIT Bombay (Powai)");
    }
}

#[tokio::test]
async fn create_assigns_an_id_when_none_is_given() {
    let h = harness(true);
    let created = h
        .catalog
        .institutions
        .create(json!({
            "instituteCode": "NITK",
            "instituteName": "NIT Karnataka",
            "keywords": ["surathkal"]
        }))
        .await
        .expect("create");

    assert!(!created.id.is_empty());
    let fetched = h
        .catalog
        .institutions
        .get_by_id(&created.id)
        .await
        .expect("fetch");
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn create_with_existing_id_replaces_and_invalidates() {
    let h = harness(true);
    seed_institutions(h.documents.as_ref()).await;
    let institutions = &h.catalog.institutions;
    institutions.get_by_id("d").await.expect("warm");

    let created = institutions
        .create(json!({
            "id": "d",
            "instituteCode": "DU",
            "instituteName": "University of Delhi"
        }))
        .await
        .expect("create");
    assert_eq!(created.id, "d");

    let fetched = institutions.get_by_id("d").await.expect("fetch");
    assert_eq!(fetched.institute_name, "University of Delhi");
    assert!(fetched.keywords.is_empty());
}

#[tokio::test]
async fn invalid_payloads_are_rejected_before_writing() {
    let h = harness(true);
    let institutions = &h.catalog.institutions;

    let cases = [
        json!({ "instituteCode": "X" }),
        json!({ "instituteCode": "", "instituteName": "Blank code" }),
        json!({ "instituteCode": "X", "instituteName": "Bad year", "year": 1200 }),
        json!({ "id": 7, "instituteCode": "X", "instituteName": "Numeric id" }),
        json!(["not", "an", "object"]),
    ];
    for payload in cases {
        let err = institutions.create(payload).await.expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Validation, "{err}");
    }
    assert_eq!(h.documents.count("colleges").await, 0);
}

#[tokio::test]
async fn update_rejects_changes_that_break_the_record() {
    let h = harness(true);
    seed_cutoffs(h.documents.as_ref()).await;
    let cutoffs = &h.catalog.cutoffs;

    let err = cutoffs
        .update("k1", json!({ "openingRank": 5000 }))
        .await
        .expect_err("inverted ranks");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = cutoffs
        .update("k1", json!({ "id": "k9" }))
        .await
        .expect_err("id change");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let unchanged = cutoffs.get_by_id("k1").await.expect("fetch");
    assert_eq!(unchanged.opening_rank, Some(100));

    let same_id = cutoffs
        .update("k1", json!({ "id": "k1", "round": 3 }))
        .await
        .expect("same id is allowed");
    assert_eq!(same_id.round, Some(3));
}

#[tokio::test]
async fn update_of_missing_record_is_not_found() {
    let h = harness(true);
    let err = h
        .catalog
        .cutoffs
        .update("ghost", json!({ "round": 2 }))
        .await
        .expect_err("missing");
    assert!(matches!(
        err,
        AppError::NotFound {
            entity: "cutoff",
            ..
        }
    ));
}

#[tokio::test]
async fn delete_confirms_and_evicts_cached_detail() {
    let h = harness(false);
    seed_institutions(h.documents.as_ref()).await;
    let institutions = &h.catalog.institutions;
    institutions.get_by_id("f").await.expect("warm");

    let confirmation = institutions.delete("f").await.expect("delete");
    assert_eq!(confirmation.id, "f");
    assert_eq!(confirmation.message, "Institution deleted successfully");

    let err = institutions.get_by_id("f").await.expect_err("gone");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = institutions.delete("f").await.expect_err("second delete");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn cutoff_delete_names_its_kind() {
    let h = harness(true);
    seed_cutoffs(h.documents.as_ref()).await;
    let confirmation = h.catalog.cutoffs.delete("k3").await.expect("delete");
    assert_eq!(confirmation.message, "Cutoff deleted successfully");
}

#[tokio::test]
async fn unreachable_cache_never_fails_reads_or_writes() {
    for mode in [InvalidationMode::Auto, InvalidationMode::Generation] {
        let (catalog, documents) = failing_cache_harness(mode);
        seed_institutions(documents.as_ref()).await;

        let record = catalog.institutions.get_by_id("a").await.expect("read");
        assert_eq!(record.institute_code, "AIIMS");

        let page = catalog
            .institutions
            .list(None, Some(3), None)
            .await
            .expect("list");
        assert_eq!(ids(&page.items), ["a", "d", "b"]);

        let updated = catalog
            .institutions
            .update("a", json!({ "city": "New Delhi" }))
            .await
            .expect("update despite failed invalidation");
        assert_eq!(updated.city.as_deref(), Some("New Delhi"));

        catalog.institutions.delete("b").await.expect("delete");
    }
}
