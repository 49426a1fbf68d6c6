mod common;

use std::collections::HashSet;

use collegium::cache::metric_names::{
    CACHE_ERROR_TOTAL, CACHE_HIT_TOTAL, CACHE_MISS_TOTAL, INVALIDATION_FAILED_TOTAL,
};
use collegium::config::InvalidationMode;
use collegium::infra::telemetry;
use common::{failing_cache_harness, harness, seed_institutions};
use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    // Miss then hit on a healthy cache.
    let h = harness(true);
    seed_institutions(h.documents.as_ref()).await;
    h.catalog.institutions.get_by_id("a").await.expect("miss");
    h.catalog.institutions.get_by_id("a").await.expect("hit");

    // Degraded reads and a failed invalidation on an unreachable cache.
    let (catalog, documents) = failing_cache_harness(InvalidationMode::Auto);
    seed_institutions(documents.as_ref()).await;
    catalog.institutions.get_by_id("b").await.expect("degraded read");
    catalog
        .institutions
        .update("b", json!({ "city": "Bangalore" }))
        .await
        .expect("update");

    let snapshot = snapshotter.snapshot().into_vec();
    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for expected in [
        CACHE_HIT_TOTAL,
        CACHE_MISS_TOTAL,
        CACHE_ERROR_TOTAL,
        INVALIDATION_FAILED_TOTAL,
    ] {
        assert!(names.contains(expected), "missing metric {expected}");
    }

    let namespaces: HashSet<String> = snapshot
        .iter()
        .flat_map(|(composite_key, _, _, _)| {
            composite_key
                .key()
                .labels()
                .filter(|label| label.key() == "namespace")
                .map(|label| label.value().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    assert!(namespaces.contains("detail"));
    assert!(namespaces.contains("list"));
    assert!(namespaces.contains("search"));
}
